//! Record stores.
//!
//! The engine reads vulnerability records through the [`RecordStore`]
//! trait: a uniform, read-only view with no other side channel. Two
//! implementations ship here — [`MemoryStore`] for tests and embedded
//! use, and [`sqlite::SqliteStore`] as the persistent projection.

pub mod sqlite;

use crate::model::VulnerabilityRecord;
use anyhow::{Result, bail};
use std::collections::BTreeMap;

pub use sqlite::SqliteStore;

/// Read-only view over a vulnerability corpus.
pub trait RecordStore {
    /// All records, in deterministic (id) order.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage cannot be read.
    fn get_all(&self) -> Result<Vec<VulnerabilityRecord>>;

    /// One record by advisory id, if present.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying storage cannot be read.
    fn get_by_id(&self, id: &str) -> Result<Option<VulnerabilityRecord>>;
}

/// In-memory record store backed by ordered maps.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, VulnerabilityRecord>,
    embeddings: BTreeMap<String, Vec<f32>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, enforcing id uniqueness and model invariants.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate ids or records failing
    /// [`VulnerabilityRecord::validate`].
    pub fn insert(&mut self, record: VulnerabilityRecord) -> Result<()> {
        if let Err(reason) = record.validate() {
            bail!("invalid record: {reason}");
        }
        if self.records.contains_key(&record.id) {
            bail!("duplicate record id {}", record.id);
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Attach a precomputed embedding vector to a record id.
    pub fn put_embedding(&mut self, id: &str, embedding: Vec<f32>) {
        self.embeddings.insert(id.to_string(), embedding);
    }

    /// All stored embeddings, keyed by record id.
    #[must_use]
    pub fn embeddings(&self) -> BTreeMap<String, Vec<f32>> {
        self.embeddings.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<VulnerabilityRecord>> {
        Ok(self.records.values().cloned().collect())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<VulnerabilityRecord>> {
        Ok(self.records.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ecosystem;
    use chrono::TimeZone;

    fn record(id: &str) -> VulnerabilityRecord {
        let at = chrono::Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .expect("valid timestamp");
        VulnerabilityRecord {
            id: id.into(),
            content: "test record".into(),
            ecosystem: Ecosystem::Npm,
            affected: vec![],
            severity: None,
            published_at: at,
            modified_at: at,
            references: vec![],
            kev: false,
            epss: None,
        }
    }

    #[test]
    fn insert_then_get_round_trip() {
        let mut store = MemoryStore::new();
        store.insert(record("CVE-2024-0001")).expect("insert");
        store.insert(record("CVE-2024-0002")).expect("insert");

        let all = store.get_all().expect("get_all");
        assert_eq!(all.len(), 2);
        // Deterministic id order.
        assert_eq!(all[0].id, "CVE-2024-0001");

        let one = store.get_by_id("CVE-2024-0002").expect("get_by_id");
        assert_eq!(one.expect("present").id, "CVE-2024-0002");
        assert!(store.get_by_id("CVE-9999-9999").expect("ok").is_none());
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut store = MemoryStore::new();
        store.insert(record("CVE-2024-0001")).expect("insert");
        assert!(store.insert(record("CVE-2024-0001")).is_err());
    }

    #[test]
    fn insert_rejects_invalid_record() {
        let mut store = MemoryStore::new();
        let mut bad = record("CVE-2024-0001");
        bad.epss = Some(7.0);
        assert!(store.insert(bad).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn embeddings_are_keyed_by_id() {
        let mut store = MemoryStore::new();
        store.insert(record("CVE-2024-0001")).expect("insert");
        store.put_embedding("CVE-2024-0001", vec![0.1, 0.2]);

        let embeddings = store.embeddings();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings["CVE-2024-0001"], vec![0.1, 0.2]);
    }
}
