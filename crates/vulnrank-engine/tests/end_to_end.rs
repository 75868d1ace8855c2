//! Full-pipeline ranking scenarios over an in-memory corpus.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use vulnrank_core::config::{EngineConfig, RerankConfig};
use vulnrank_core::model::{
    AffectedPackage, Ecosystem, InfrastructureContext, InstalledPackage, MatchTier, QueryFilters,
    QueryRequest, RiskLevel, Severity, VersionSpec, VulnerabilityRecord,
};
use vulnrank_core::store::MemoryStore;
use vulnrank_engine::{CorpusSnapshot, Engine};
use vulnrank_search::rerank::RerankModel;
use vulnrank_search::semantic::Embedder;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
}

fn record(id: &str, content: &str, ecosystem: Ecosystem) -> VulnerabilityRecord {
    VulnerabilityRecord {
        id: id.into(),
        content: content.into(),
        ecosystem,
        affected: vec![],
        severity: None,
        published_at: ts(1_700_000_000),
        modified_at: ts(1_700_000_000),
        references: vec![],
        kev: false,
        epss: None,
    }
}

fn affected(name: &str, ecosystem: Ecosystem, introduced: &str, fixed: Option<&str>) -> AffectedPackage {
    AffectedPackage {
        name: name.into(),
        ecosystem,
        ranges: vec![VersionSpec::Range {
            introduced: introduced.into(),
            fixed: fixed.map(Into::into),
        }],
    }
}

fn installed(ecosystem: Ecosystem, name: &str, version: &str) -> InstalledPackage {
    InstalledPackage {
        ecosystem,
        name: name.into(),
        version: version.into(),
    }
}

/// Three records with sharply different risk profiles:
/// (a) actively exploited, critical, unpatched, exact infra match;
/// (b) moderate, already patched in the context;
/// (c) no severity data, ecosystem-level match only.
fn scenario_engine() -> Engine {
    let mut store = MemoryStore::new();

    let mut a = record(
        "GHSA-aaaa",
        "flask template injection remote code execution",
        Ecosystem::PyPi,
    );
    a.affected = vec![affected("flask", Ecosystem::PyPi, "0", None)];
    a.severity = Some(Severity {
        score: 9.8,
        vector: Some("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:C".into()),
    });
    a.kev = true;
    store.insert(a).expect("insert a");

    let mut b = record(
        "GHSA-bbbb",
        "injection in log4j jndi lookup",
        Ecosystem::Maven,
    );
    b.affected = vec![affected("log4j-core", Ecosystem::Maven, "2.0", Some("2.17.0"))];
    b.severity = Some(Severity {
        score: 5.0,
        vector: None,
    });
    store.insert(b).expect("insert b");

    let mut c = record(
        "GHSA-cccc",
        "flask template injection in jinja rendering",
        Ecosystem::PyPi,
    );
    c.affected = vec![affected("requests", Ecosystem::PyPi, "0", None)];
    store.insert(c).expect("insert c");

    let snapshot = CorpusSnapshot::build(&store, BTreeMap::new()).expect("build snapshot");
    Engine::new(snapshot, EngineConfig::default())
}

fn scenario_request() -> QueryRequest {
    let mut context = InfrastructureContext::default();
    context.packages.insert(installed(Ecosystem::PyPi, "flask", "2.0.0"));
    context
        .packages
        .insert(installed(Ecosystem::Maven, "log4j-core", "2.17.1"));

    QueryRequest {
        text: "flask template injection".into(),
        context,
        filters: QueryFilters::default(),
    }
}

#[test]
fn three_record_scenario_ranks_by_risk() {
    let engine = scenario_engine();
    let response = engine.search(&scenario_request()).expect("search");

    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|result| result.record_id.as_str())
        .collect();
    assert_eq!(ids, ["GHSA-aaaa", "GHSA-cccc", "GHSA-bbbb"]);

    let top = &response.results[0];
    assert_eq!(top.match_tier, MatchTier::Exact);
    assert_eq!(top.risk_level, RiskLevel::High);
    assert!((top.risk_score - 74.2).abs() < 1e-9);
    assert!((top.risk_factors["cvss"] - 39.2).abs() < 1e-9);
    assert!((top.risk_factors["kev"] - 20.0).abs() < 1e-9);
    assert!((top.risk_factors["patch"] - 10.0).abs() < 1e-9);
    assert!((top.risk_factors["tier"] - 5.0).abs() < 1e-9);

    // (b) runs the fixed release: patched credit, ecosystem tier only.
    let patched = &response.results[2];
    assert_eq!(patched.match_tier, MatchTier::Ecosystem);
    assert!((patched.risk_factors["patch"] + 10.0).abs() < 1e-9);
}

#[test]
fn risk_scores_reconstruct_from_factors() {
    let engine = scenario_engine();
    let response = engine.search(&scenario_request()).expect("search");

    for result in &response.results {
        let rebuilt = result.risk_factors.values().sum::<f64>().clamp(0.0, 100.0);
        assert!(
            (result.risk_score - rebuilt).abs() < 1e-9,
            "factors for {} do not reconstruct the score",
            result.record_id
        );
        assert!((0.0..=100.0).contains(&result.risk_score));
    }
}

#[test]
fn output_is_a_strict_total_order() {
    let engine = scenario_engine();
    let response = engine.search(&scenario_request()).expect("search");

    for pair in response.results.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        let tied = (left.risk_score - right.risk_score).abs() < 1e-12
            && (left.relevance_score - right.relevance_score).abs() < 1e-12
            && left.record_id == right.record_id;
        assert!(!tied, "results tie on the full ordering tuple");
        assert!(left.risk_score >= right.risk_score);
    }
}

#[test]
fn exact_containment_for_flask_range() {
    let mut store = MemoryStore::new();
    let mut rec = record("GHSA-flask", "flask session fixation", Ecosystem::PyPi);
    rec.affected = vec![affected("flask", Ecosystem::PyPi, "0", Some("2.3.0"))];
    store.insert(rec).expect("insert");

    let snapshot = CorpusSnapshot::build(&store, BTreeMap::new()).expect("build");
    let engine = Engine::new(snapshot, EngineConfig::default());

    let mut context = InfrastructureContext::default();
    context.packages.insert(installed(Ecosystem::PyPi, "flask", "2.0.0"));
    let request = QueryRequest {
        text: "flask session fixation".into(),
        context,
        filters: QueryFilters::default(),
    };

    let response = engine.search(&request).expect("search");
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].match_tier, MatchTier::Exact);
}

#[test]
fn id_filter_surfaces_records_without_text_evidence() {
    let engine = scenario_engine();
    let request = QueryRequest {
        text: "completely unrelated query terms".into(),
        context: InfrastructureContext::default(),
        filters: QueryFilters {
            ids: vec!["GHSA-bbbb".into()],
            ..QueryFilters::default()
        },
    };

    let response = engine.search(&request).expect("search");
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].record_id, "GHSA-bbbb");
    assert!((response.results[0].relevance_score - 0.0).abs() < 1e-12);
}

#[test]
fn ecosystem_filter_narrows_the_candidate_set() {
    let engine = scenario_engine();
    let mut request = scenario_request();
    request.filters.ecosystems = vec![Ecosystem::Maven];

    let response = engine.search(&request).expect("search");
    let ids: Vec<&str> = response
        .results
        .iter()
        .map(|result| result.record_id.as_str())
        .collect();
    assert_eq!(ids, ["GHSA-bbbb"]);
}

#[test]
fn limit_truncates_the_result_list() {
    let engine = {
        let mut store = MemoryStore::new();
        for idx in 0..5 {
            store
                .insert(record(
                    &format!("CVE-2024-000{idx}"),
                    "buffer overflow in parser",
                    Ecosystem::Npm,
                ))
                .expect("insert");
        }
        let snapshot = CorpusSnapshot::build(&store, BTreeMap::new()).expect("build");
        let config = EngineConfig {
            limit: 2,
            ..EngineConfig::default()
        };
        Engine::new(snapshot, config)
    };

    let response = engine
        .search(&QueryRequest::new("buffer overflow"))
        .expect("search");
    assert_eq!(response.results.len(), 2);
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

    // Whatever the risk inputs, the pipeline must emit a risk-ordered
    // list of clamped, factor-reconstructable scores.
    #[test]
    fn ranking_is_ordered_and_reconstructable(
        specs in proptest::collection::vec(
            (
                proptest::option::of(0.0_f64..=10.0),
                proptest::option::of(0.0_f64..=1.0),
                proptest::prelude::any::<bool>(),
            ),
            1..6,
        ),
    ) {
        let mut store = MemoryStore::new();
        for (idx, (cvss, epss, kev)) in specs.iter().enumerate() {
            let mut rec = record(
                &format!("CVE-2024-{idx:04}"),
                "heap overflow in codec",
                Ecosystem::Npm,
            );
            rec.severity = cvss.map(|score| Severity { score, vector: None });
            rec.epss = *epss;
            rec.kev = *kev;
            store.insert(rec).expect("insert");
        }
        let snapshot = CorpusSnapshot::build(&store, BTreeMap::new()).expect("build");
        let engine = Engine::new(snapshot, EngineConfig::default());

        let response = engine
            .search(&QueryRequest::new("heap overflow"))
            .expect("search");

        proptest::prop_assert_eq!(response.results.len(), specs.len());
        for pair in response.results.windows(2) {
            proptest::prop_assert!(pair[0].risk_score >= pair[1].risk_score - 1e-12);
        }
        for result in &response.results {
            proptest::prop_assert!((0.0..=100.0).contains(&result.risk_score));
            let rebuilt = result.risk_factors.values().sum::<f64>().clamp(0.0, 100.0);
            proptest::prop_assert!((result.risk_score - rebuilt).abs() < 1e-9);
        }
    }
}

struct AxisEmbedder;

impl Embedder for AxisEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

struct FlatReranker;

impl RerankModel for FlatReranker {
    fn score(&self, _query: &str, _candidate: &str) -> anyhow::Result<f64> {
        Ok(100.0)
    }
}

#[test]
fn rerank_slot_goes_to_the_newer_record_on_relevance_ties() {
    let mut store = MemoryStore::new();
    store
        .insert(record("CVE-AAAA", "flask template injection", Ecosystem::PyPi))
        .expect("insert");
    let mut newer = record("CVE-BBBB", "flask template injection", Ecosystem::PyPi);
    newer.modified_at = ts(1_700_086_400);
    store.insert(newer).expect("insert");
    // Identical lexical evidence; semantic order is reversed, so the
    // fused scores come out equal.
    store.put_embedding("CVE-AAAA", vec![0.6, 0.8]);
    store.put_embedding("CVE-BBBB", vec![1.0, 0.0]);

    let snapshot = CorpusSnapshot::build(&store, store.embeddings()).expect("build");
    let config = EngineConfig {
        rerank: RerankConfig {
            top_k: 1,
            timeout_ms: 1_000,
        },
        ..EngineConfig::default()
    };
    let engine = Engine::new(snapshot, config)
        .with_embedder(Arc::new(AxisEmbedder))
        .with_reranker(Arc::new(FlatReranker));

    let response = engine
        .search(&QueryRequest::new("flask template injection"))
        .expect("search");

    // The tie must break on modified_at recency, so the single rerank
    // slot belongs to the newer record.
    assert_eq!(response.results[0].record_id, "CVE-BBBB");
    assert!((response.results[0].relevance_score - 100.0).abs() < 1e-9);
}

#[test]
fn search_response_json_round_trip() {
    let engine = scenario_engine();
    let response = engine.search(&scenario_request()).expect("search");

    let json = serde_json::to_string(&response).expect("serialize");
    let back: vulnrank_core::model::SearchResponse =
        serde_json::from_str(&json).expect("deserialize");
    assert_eq!(response, back);
}

#[test]
fn reload_swaps_the_snapshot_for_new_queries() {
    let mut engine = scenario_engine();
    let before = engine.snapshot();

    let mut store = MemoryStore::new();
    store
        .insert(record("CVE-NEW", "fresh advisory", Ecosystem::Go))
        .expect("insert");
    let next = CorpusSnapshot::build(&store, BTreeMap::new()).expect("build");
    engine.reload(next);

    let after = engine.snapshot();
    assert!(after.version() > before.version());
    // The old snapshot is still fully usable by in-flight queries.
    assert_eq!(before.len(), 3);
    assert_eq!(after.len(), 1);
}
