//! In-memory Okapi BM25 index over record content.
//!
//! Built once per corpus snapshot and immutable afterwards; scoring is
//! a pure read. Standard parameters (k1 = 1.2, b = 0.75): k1 saturates
//! per-term frequency so a record repeating "overflow" fifty times is
//! not fifty times more relevant, and b normalizes by document length
//! so long advisories are not penalized disproportionately.

use super::tokenizer::tokenize;
use std::collections::BTreeMap;

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// Immutable BM25 index over a fixed document set.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    docs: Vec<DocEntry>,
    /// Number of documents containing each term.
    doc_freq: BTreeMap<String, u32>,
    avg_len: f64,
}

#[derive(Debug, Clone)]
struct DocEntry {
    id: String,
    term_counts: BTreeMap<String, u32>,
    len: u32,
}

impl Bm25Index {
    /// Build an index from `(id, content)` pairs.
    pub fn build<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (String, S)>,
        S: AsRef<str>,
    {
        let mut docs = Vec::new();
        let mut doc_freq: BTreeMap<String, u32> = BTreeMap::new();
        let mut total_len: u64 = 0;

        for (id, content) in documents {
            let terms = tokenize(content.as_ref());
            let mut term_counts: BTreeMap<String, u32> = BTreeMap::new();
            for term in &terms {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
            }
            for term in term_counts.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }

            let len = u32::try_from(terms.len()).unwrap_or(u32::MAX);
            total_len += u64::from(len);
            docs.push(DocEntry {
                id,
                term_counts,
                len,
            });
        }

        let avg_len = if docs.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                total_len as f64 / docs.len() as f64
            }
        };

        Self {
            docs,
            doc_freq,
            avg_len,
        }
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Score every document against a free-text query.
    ///
    /// Returns only strictly-positive scores; records sharing no term
    /// with the query are absent from the map.
    #[must_use]
    pub fn score(&self, query: &str) -> BTreeMap<String, f64> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.docs.is_empty() {
            return BTreeMap::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let doc_count = self.docs.len() as f64;

        let mut out = BTreeMap::new();
        for doc in &self.docs {
            let mut score = 0.0;
            for term in &query_terms {
                let Some(&tf) = doc.term_counts.get(term) else {
                    continue;
                };
                let df = f64::from(self.doc_freq.get(term).copied().unwrap_or(0));
                // Lucene-style smoothed IDF, never negative.
                let idf = (1.0 + (doc_count - df + 0.5) / (df + 0.5)).ln();

                let tf = f64::from(tf);
                let len_norm = 1.0 - B + B * f64::from(doc.len) / self.avg_len.max(1.0);
                score += idf * tf * (K1 + 1.0) / (tf + K1 * len_norm);
            }
            if score > 0.0 {
                out.insert(doc.id.clone(), score);
            }
        }
        out
    }

    /// Document ids ranked by score descending, id ascending on ties.
    #[must_use]
    pub fn ranked(&self, query: &str) -> Vec<(String, f64)> {
        let mut scored: Vec<(String, f64)> = self.score(query).into_iter().collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Bm25Index {
        Bm25Index::build([
            (
                "GHSA-aaaa".to_string(),
                "remote code execution in nginx 1.24 http parser",
            ),
            (
                "GHSA-bbbb".to_string(),
                "denial of service in apache httpd request handling",
            ),
            (
                "GHSA-cccc".to_string(),
                "nginx configuration disclosure via log handler in nginx modules",
            ),
        ])
    }

    #[test]
    fn no_shared_terms_means_no_score() {
        let scores = index().score("kubernetes escape");
        assert!(scores.is_empty());
    }

    #[test]
    fn matching_docs_score_positive() {
        let scores = index().score("nginx");
        assert_eq!(scores.len(), 2);
        assert!(scores.values().all(|&s| s > 0.0));
        assert!(!scores.contains_key("GHSA-bbbb"));
    }

    #[test]
    fn version_token_matches_exactly() {
        let scores = index().score("nginx 1.24");
        // Only GHSA-aaaa contains the version term.
        assert!(scores["GHSA-aaaa"] > scores["GHSA-cccc"]);
    }

    #[test]
    fn query_is_case_insensitive() {
        let upper = index().score("NGINX");
        let lower = index().score("nginx");
        assert_eq!(upper, lower);
    }

    #[test]
    fn rare_terms_outweigh_common_ones() {
        let idx = Bm25Index::build([
            ("d1".to_string(), "overflow overflow overflow common"),
            ("d2".to_string(), "heap grooming common"),
            ("d3".to_string(), "common words only here"),
        ]);
        let scores = idx.score("heap");
        // "heap" appears in one document; it must rank above any
        // common-term-only match.
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key("d2"));
    }

    #[test]
    fn term_frequency_saturates() {
        let idx = Bm25Index::build([
            ("few".to_string(), "overflow bug"),
            ("many".to_string(), "overflow overflow overflow overflow overflow overflow bug"),
        ]);
        let scores = idx.score("overflow");
        let ratio = scores["many"] / scores["few"];
        // Six times the occurrences must be well under six times the score.
        assert!(ratio < 3.0, "saturation failed, ratio {ratio}");
    }

    #[test]
    fn ranked_output_is_deterministic() {
        let idx = Bm25Index::build([
            ("b".to_string(), "same words here"),
            ("a".to_string(), "same words here"),
        ]);
        let ranked = idx.ranked("same words");
        assert_eq!(ranked.len(), 2);
        // Equal scores break ties by id.
        assert_eq!(ranked[0].0, "a");
        assert_eq!(ranked[1].0, "b");
    }

    #[test]
    fn empty_query_and_empty_index() {
        assert!(index().score("").is_empty());
        let empty = Bm25Index::build(Vec::<(String, &str)>::new());
        assert!(empty.is_empty());
        assert!(empty.score("nginx").is_empty());
    }
}
