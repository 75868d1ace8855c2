//! Immutable, versioned corpus snapshots.
//!
//! A snapshot is built once from a record store, carries its own BM25
//! index and embedding table, and is never mutated. Reload means
//! building a new snapshot and swapping the `Arc`; in-flight queries
//! keep the snapshot they started with.

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use vulnrank_core::EngineError;
use vulnrank_core::model::VulnerabilityRecord;
use vulnrank_core::store::RecordStore;
use vulnrank_search::Bm25Index;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// One immutable view of the corpus, ready to query.
#[derive(Debug)]
pub struct CorpusSnapshot {
    version: u64,
    records: BTreeMap<String, VulnerabilityRecord>,
    index: Bm25Index,
    embeddings: BTreeMap<String, Vec<f32>>,
    embedding_dim: Option<usize>,
    recency: BTreeMap<String, DateTime<Utc>>,
    skipped_records: u64,
    skipped_embeddings: u64,
}

impl CorpusSnapshot {
    /// Build a snapshot from a store plus precomputed embeddings.
    ///
    /// Records failing [`VulnerabilityRecord::validate`] are skipped
    /// and counted, not fatal. Embeddings whose dimension deviates
    /// from the first one seen are skipped likewise; the dimension of
    /// the survivors becomes the snapshot's fixed dimension.
    ///
    /// # Errors
    ///
    /// [`EngineError::EmptyCorpus`] when the store holds no valid
    /// records; [`EngineError::Store`] when it cannot be read.
    pub fn build(
        store: &dyn RecordStore,
        embeddings: BTreeMap<String, Vec<f32>>,
    ) -> Result<Self, EngineError> {
        let all = store.get_all().context("load corpus records")?;

        let mut records = BTreeMap::new();
        let mut recency = BTreeMap::new();
        let mut skipped_records = 0_u64;
        for record in all {
            if let Err(reason) = record.validate() {
                debug!("skipping invalid record {}: {reason}", record.id);
                skipped_records += 1;
                continue;
            }
            recency.insert(record.id.clone(), record.modified_at);
            records.insert(record.id.clone(), record);
        }
        if records.is_empty() {
            return Err(EngineError::EmptyCorpus);
        }

        let index = Bm25Index::build(
            records
                .values()
                .map(|record| (record.id.clone(), record.content.clone())),
        );

        let mut embedding_dim = None;
        let mut kept = BTreeMap::new();
        let mut skipped_embeddings = 0_u64;
        for (id, embedding) in embeddings {
            if !records.contains_key(&id) {
                debug!("dropping embedding for unknown record {id}");
                skipped_embeddings += 1;
                continue;
            }
            match embedding_dim {
                None => {
                    embedding_dim = Some(embedding.len());
                    kept.insert(id, embedding);
                }
                Some(dim) if embedding.len() == dim => {
                    kept.insert(id, embedding);
                }
                Some(dim) => {
                    debug!(
                        "skipping embedding for {id}: dimension {} deviates from {dim}",
                        embedding.len()
                    );
                    skipped_embeddings += 1;
                }
            }
        }

        let version = NEXT_VERSION.fetch_add(1, Ordering::Relaxed);
        info!(
            "built corpus snapshot v{version}: {} records ({skipped_records} skipped), \
             {} embeddings ({skipped_embeddings} skipped)",
            records.len(),
            kept.len(),
        );

        Ok(Self {
            version,
            records,
            index,
            embeddings: kept,
            embedding_dim,
            recency,
            skipped_records,
            skipped_embeddings,
        })
    }

    /// Monotonic snapshot version, unique per process.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub const fn records(&self) -> &BTreeMap<String, VulnerabilityRecord> {
        &self.records
    }

    #[must_use]
    pub fn record(&self, id: &str) -> Option<&VulnerabilityRecord> {
        self.records.get(id)
    }

    #[must_use]
    pub const fn index(&self) -> &Bm25Index {
        &self.index
    }

    /// `modified_at` per record id, for fusion tie-breaking.
    #[must_use]
    pub const fn recency(&self) -> &BTreeMap<String, DateTime<Utc>> {
        &self.recency
    }

    /// The snapshot's fixed embedding dimension; `None` when no
    /// embeddings were loaded.
    #[must_use]
    pub const fn embedding_dim(&self) -> Option<usize> {
        self.embedding_dim
    }

    /// `(id, vector)` pairs restricted to the given candidate ids.
    pub fn embeddings_for<'a>(
        &'a self,
        ids: impl IntoIterator<Item = &'a str> + 'a,
    ) -> impl Iterator<Item = (&'a str, &'a [f32])> + 'a {
        ids.into_iter().filter_map(|id| {
            self.embeddings
                .get_key_value(id)
                .map(|(id, embedding)| (id.as_str(), embedding.as_slice()))
        })
    }

    /// Records dropped at build time for failing validation.
    #[must_use]
    pub const fn skipped_records(&self) -> u64 {
        self.skipped_records
    }

    /// Embeddings dropped at build time for dimension or id mismatch.
    #[must_use]
    pub const fn skipped_embeddings(&self) -> u64 {
        self.skipped_embeddings
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
