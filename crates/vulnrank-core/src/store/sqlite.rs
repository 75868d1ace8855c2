//! SQLite-backed record store.
//!
//! The projection is a plain table with JSON columns for the nested
//! parts of the record (`affected`, `references`) and a separate
//! `record_embeddings` table holding precomputed vectors as JSON arrays.
//! During serving the store is effectively read-only; corpus reloads
//! happen out-of-band and queries run against snapshots, never against
//! a connection shared with a writer.

use super::RecordStore;
use crate::model::{Ecosystem, Severity, VulnerabilityRecord};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id              TEXT PRIMARY KEY,
    content         TEXT NOT NULL,
    ecosystem       TEXT NOT NULL,
    affected_json   TEXT NOT NULL,
    cvss_score      REAL,
    cvss_vector     TEXT,
    published_at    TEXT NOT NULL,
    modified_at     TEXT NOT NULL,
    references_json TEXT NOT NULL,
    kev             INTEGER NOT NULL DEFAULT 0,
    epss            REAL
);
CREATE TABLE IF NOT EXISTS record_embeddings (
    record_id      TEXT PRIMARY KEY REFERENCES records(id),
    embedding_json TEXT NOT NULL
);
";

/// SQLite projection of a vulnerability corpus.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at `path` and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("open record store {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory record store")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("create record store schema")?;
        Ok(Self { conn })
    }

    /// Insert or replace a record, enforcing model invariants first.
    ///
    /// # Errors
    ///
    /// Returns an error for records failing
    /// [`VulnerabilityRecord::validate`] or on SQL failure.
    pub fn upsert_record(&self, record: &VulnerabilityRecord) -> Result<()> {
        if let Err(reason) = record.validate() {
            bail!("invalid record: {reason}");
        }

        let affected_json =
            serde_json::to_string(&record.affected).context("serialize affected packages")?;
        let references_json =
            serde_json::to_string(&record.references).context("serialize references")?;
        let ecosystem_json =
            serde_json::to_string(&record.ecosystem).context("serialize ecosystem")?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO records
                 (id, content, ecosystem, affected_json, cvss_score, cvss_vector,
                  published_at, modified_at, references_json, kev, epss)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.content,
                    ecosystem_json,
                    affected_json,
                    record.severity.as_ref().map(|s| s.score),
                    record.severity.as_ref().and_then(|s| s.vector.clone()),
                    record.published_at.to_rfc3339(),
                    record.modified_at.to_rfc3339(),
                    references_json,
                    i64::from(record.kev),
                    record.epss,
                ],
            )
            .with_context(|| format!("upsert record {}", record.id))?;
        Ok(())
    }

    /// Store the precomputed embedding vector for a record.
    ///
    /// # Errors
    ///
    /// Returns an error on SQL failure.
    pub fn put_embedding(&self, id: &str, embedding: &[f32]) -> Result<()> {
        let embedding_json = serde_json::to_string(embedding).context("serialize embedding")?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO record_embeddings (record_id, embedding_json)
                 VALUES (?1, ?2)",
                params![id, embedding_json],
            )
            .with_context(|| format!("store embedding for {id}"))?;
        Ok(())
    }

    /// Bulk-load all stored embeddings, skipping malformed rows.
    ///
    /// # Errors
    ///
    /// Returns an error when the embeddings table cannot be read.
    pub fn embeddings(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT record_id, embedding_json FROM record_embeddings")
            .context("prepare embedding query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("execute embedding query")?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (record_id, embedding_json) = row.context("read embedding row")?;
            match serde_json::from_str::<Vec<f32>>(&embedding_json) {
                Ok(embedding) => {
                    out.insert(record_id, embedding);
                }
                Err(err) => {
                    debug!("skipping malformed embedding row for {record_id}: {err}");
                }
            }
        }
        Ok(out)
    }

    /// Number of records in the store, for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error on SQL failure.
    pub fn record_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .context("count records")?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            content: row.get(1)?,
            ecosystem_json: row.get(2)?,
            affected_json: row.get(3)?,
            cvss_score: row.get(4)?,
            cvss_vector: row.get(5)?,
            published_at: row.get(6)?,
            modified_at: row.get(7)?,
            references_json: row.get(8)?,
            kev: row.get(9)?,
            epss: row.get(10)?,
        })
    }
}

const SELECT_COLUMNS: &str = "id, content, ecosystem, affected_json, cvss_score, cvss_vector, \
                              published_at, modified_at, references_json, kev, epss";

struct RawRow {
    id: String,
    content: String,
    ecosystem_json: String,
    affected_json: String,
    cvss_score: Option<f64>,
    cvss_vector: Option<String>,
    published_at: String,
    modified_at: String,
    references_json: String,
    kev: i64,
    epss: Option<f64>,
}

impl RawRow {
    fn into_record(self) -> Result<VulnerabilityRecord> {
        let ecosystem: Ecosystem = serde_json::from_str(&self.ecosystem_json)
            .with_context(|| format!("parse ecosystem for {}", self.id))?;
        let affected = serde_json::from_str(&self.affected_json)
            .with_context(|| format!("parse affected packages for {}", self.id))?;
        let references = serde_json::from_str(&self.references_json)
            .with_context(|| format!("parse references for {}", self.id))?;
        let published_at = parse_timestamp(&self.published_at)
            .with_context(|| format!("parse published_at for {}", self.id))?;
        let modified_at = parse_timestamp(&self.modified_at)
            .with_context(|| format!("parse modified_at for {}", self.id))?;

        Ok(VulnerabilityRecord {
            id: self.id,
            content: self.content,
            ecosystem,
            affected,
            severity: self.cvss_score.map(|score| Severity {
                score,
                vector: self.cvss_vector,
            }),
            published_at,
            modified_at,
            references,
            kev: self.kev != 0,
            epss: self.epss,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid RFC 3339 timestamp {raw:?}"))?;
    Ok(parsed.with_timezone(&Utc))
}

impl RecordStore for SqliteStore {
    fn get_all(&self) -> Result<Vec<VulnerabilityRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM records ORDER BY id");
        let mut stmt = self.conn.prepare(&sql).context("prepare get_all query")?;
        let rows = stmt
            .query_map([], Self::row_to_record)
            .context("execute get_all query")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context("read record row")?.into_record()?);
        }
        Ok(records)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<VulnerabilityRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM records WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).context("prepare get_by_id query")?;
        let row = stmt
            .query_row(params![id], Self::row_to_record)
            .optional()
            .with_context(|| format!("fetch record {id}"))?;

        row.map(RawRow::into_record).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AffectedPackage, Reference, VersionSpec};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
    }

    fn sample_record(id: &str) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.into(),
            content: "remote code execution in image parser".into(),
            ecosystem: Ecosystem::PyPi,
            affected: vec![AffectedPackage {
                name: "pillow".into(),
                ecosystem: Ecosystem::PyPi,
                ranges: vec![VersionSpec::Range {
                    introduced: "0".into(),
                    fixed: Some("10.2.0".into()),
                }],
            }],
            severity: Some(Severity {
                score: 9.8,
                vector: None,
            }),
            published_at: ts(1_700_000_000),
            modified_at: ts(1_700_500_000),
            references: vec![Reference {
                kind: "FIX".into(),
                url: "https://example.invalid/fix".into(),
            }],
            kev: true,
            epss: Some(0.93),
        }
    }

    #[test]
    fn upsert_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().expect("open");
        let record = sample_record("GHSA-1111-2222-3333");
        store.upsert_record(&record).expect("upsert");

        let fetched = store
            .get_by_id("GHSA-1111-2222-3333")
            .expect("get_by_id")
            .expect("present");
        assert_eq!(fetched, record);

        let all = store.get_all().expect("get_all");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], record);
    }

    #[test]
    fn get_all_returns_id_order() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .upsert_record(&sample_record("CVE-2024-0002"))
            .expect("upsert");
        store
            .upsert_record(&sample_record("CVE-2024-0001"))
            .expect("upsert");

        let all = store.get_all().expect("get_all");
        assert_eq!(all[0].id, "CVE-2024-0001");
        assert_eq!(all[1].id, "CVE-2024-0002");
    }

    #[test]
    fn missing_record_is_none() {
        let store = SqliteStore::open_in_memory().expect("open");
        assert!(store.get_by_id("CVE-0000-0000").expect("query").is_none());
    }

    #[test]
    fn upsert_rejects_invalid_record() {
        let store = SqliteStore::open_in_memory().expect("open");
        let mut bad = sample_record("CVE-2024-0001");
        bad.published_at = ts(2_000_000_000);
        assert!(store.upsert_record(&bad).is_err());
        assert_eq!(store.record_count().expect("count"), 0);
    }

    #[test]
    fn embeddings_round_trip_and_skip_malformed() {
        let store = SqliteStore::open_in_memory().expect("open");
        store
            .upsert_record(&sample_record("CVE-2024-0001"))
            .expect("upsert");
        store
            .put_embedding("CVE-2024-0001", &[0.25, -0.5, 1.0])
            .expect("embed");

        // Malformed row should be skipped, not fatal.
        store
            .upsert_record(&sample_record("CVE-2024-0002"))
            .expect("upsert");
        store
            .conn
            .execute(
                "INSERT INTO record_embeddings (record_id, embedding_json)
                 VALUES ('CVE-2024-0002', 'not json')",
                [],
            )
            .expect("insert malformed");

        let embeddings = store.embeddings().expect("load");
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings["CVE-2024-0001"], vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn open_on_disk_persists_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corpus.db");

        {
            let store = SqliteStore::open(&path).expect("open");
            store
                .upsert_record(&sample_record("CVE-2024-0001"))
                .expect("upsert");
        }

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.record_count().expect("count"), 1);
    }
}
