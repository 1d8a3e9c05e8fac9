//! End-to-end harness runs over in-process collaborators.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use vecprobe::config::{HarnessConfig, OracleSettings};
use vecprobe::document::{CollectionTarget, Document, IdPolicy, StoredRecord};
use vecprobe::embedding::{EmbeddingProvider, HashEmbeddingProvider, cosine_similarity};
use vecprobe::error::{ProbeError, Result};
use vecprobe::harness::Harness;
use vecprobe::inmemory::InMemoryVectorStore;
use vecprobe::inversion::CorpusInverter;
use vecprobe::oracle::{EncryptionOracle, LocalOracle};
use vecprobe::vectorstore::VectorStore;
use vecprobe::verdict::{AttackMode, Verdict};

const DIM: usize = 768;

const SENTENCES: [&str; 5] = [
    "The cat sat on the mat.",
    "Paris is the capital of France.",
    "Machine learning uses neural networks.",
    "The Eiffel Tower is located in Paris.",
    "Water freezes at zero degrees Celsius.",
];

const DOCUMENTS: [&str; 10] = [
    "Vector databases store high-dimensional embeddings for similarity search.",
    "Machine learning models convert text into numerical representations.",
    "Kubernetes orchestrates containerized applications across clusters.",
    "HashiCorp Vault secures secrets and sensitive data.",
    "Python is a popular programming language for data science.",
    "Neural networks learn patterns from training data.",
    "Docker containers package applications with their dependencies.",
    "PostgreSQL is a powerful open-source relational database.",
    "API gateways manage and secure microservice communication.",
    "Encryption protects data from unauthorized access.",
];

const QUERIES: [&str; 5] = [
    "How do vector databases work?",
    "What is machine learning?",
    "Container orchestration tools",
    "Secrets management solutions",
    "Programming languages for AI",
];

fn targets() -> [CollectionTarget; 2] {
    [CollectionTarget::plain("raw"), CollectionTarget::encrypted("secure")]
}

async fn harness_with(oracle: Arc<dyn EncryptionOracle>) -> (Harness, Arc<InMemoryVectorStore>) {
    let store = Arc::new(InMemoryVectorStore::new());
    let harness = Harness::builder()
        .config(HarnessConfig::default())
        .embedding_provider(Arc::new(HashEmbeddingProvider::new(DIM)))
        .oracle(oracle)
        .vector_store(store.clone())
        .build()
        .unwrap();
    (harness, store)
}

async fn configured_harness() -> (Harness, Arc<InMemoryVectorStore>) {
    let (harness, store) = harness_with(Arc::new(LocalOracle::new())).await;
    harness.configure_oracle().await.unwrap();
    harness.ingestion().prepare_collections(&targets()).await.unwrap();
    (harness, store)
}

/// Returns the vector unchanged.
struct IdentityOracle {
    settings: tokio::sync::RwLock<Option<OracleSettings>>,
}

#[async_trait]
impl EncryptionOracle for IdentityOracle {
    async fn configure(&self, settings: OracleSettings) -> Result<()> {
        *self.settings.write().await = Some(settings);
        Ok(())
    }

    async fn encrypt(&self, vector: &[f32]) -> Result<Vec<f32>> {
        Ok(vector.to_vec())
    }

    async fn settings(&self) -> Option<OracleSettings> {
        *self.settings.read().await
    }
}

/// Delegates to a [`LocalOracle`] but fails the encrypt call numbered `fail_on`.
struct FlakyOracle {
    inner: LocalOracle,
    calls: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl EncryptionOracle for FlakyOracle {
    async fn configure(&self, settings: OracleSettings) -> Result<()> {
        self.inner.configure(settings).await
    }

    async fn encrypt(&self, vector: &[f32]) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_on {
            return Err(ProbeError::Oracle { message: "connection reset".into() });
        }
        self.inner.encrypt(vector).await
    }

    async fn settings(&self) -> Option<OracleSettings> {
        self.inner.settings().await
    }
}

#[tokio::test]
async fn own_vectors_rank_first_in_both_collections() {
    let (harness, _store) = configured_harness().await;
    let documents = vec![
        Document::new("D1", SENTENCES[0]),
        Document::new("D2", SENTENCES[1]),
        Document::new("D3", SENTENCES[4]),
    ];
    let report = harness.ingestion().ingest(&documents, &targets()).await.unwrap();
    assert!(report.is_complete());
    let similarity = report.ingested[0].ciphertext_similarity.unwrap();
    assert!(similarity < 0.5, "ciphertext too close to its plaintext: {similarity}");

    let embedding = harness.embedding_provider().embed(SENTENCES[0]).await.unwrap();
    let raw_hits = harness.vector_store().search("raw", &embedding, 3).await.unwrap();
    assert_eq!(raw_hits[0].id, "D1");
    assert!((raw_hits[0].score - 1.0).abs() < 1e-4);
    assert!(raw_hits.iter().all(|hit| hit.score <= raw_hits[0].score));

    let ciphertext = harness.oracle().encrypt(&embedding).await.unwrap();
    let secure_hits = harness.vector_store().search("secure", &ciphertext, 3).await.unwrap();
    assert_eq!(secure_hits[0].id, "D1");
    assert!((secure_hits[0].score - 1.0).abs() < 1e-4);

    assert!(cosine_similarity(&embedding, &ciphertext) < 0.5);
    let max_coordinate_gap = embedding
        .iter()
        .zip(&ciphertext)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(max_coordinate_gap > 0.1);
}

#[tokio::test]
async fn raw_records_invert_and_secure_records_do_not() {
    let (harness, _store) = configured_harness().await;
    let documents = Document::with_policy(&SENTENCES[..], &IdPolicy::ContentHash);
    harness.ingestion().ingest(&documents, &targets()).await.unwrap();

    let inverter = Arc::new(
        CorpusInverter::build(harness.embedding_provider().clone(), &SENTENCES[..]).await.unwrap(),
    );
    let attacker = harness.attacker(inverter);

    let raw = attacker.attack_collection("raw", AttackMode::Unprotected).await.unwrap();
    assert!(raw.failures.is_empty());
    assert_eq!(raw.verdicts.len(), SENTENCES.len());
    assert!(
        raw.verdicts
            .iter()
            .all(|v| matches!(v.verdict, Verdict::Recovered | Verdict::Partial))
    );
    assert_eq!(raw.recovered() + raw.partial(), SENTENCES.len());
    assert!(raw.breached());

    let secure = attacker.attack_collection("secure", AttackMode::Protected).await.unwrap();
    assert!(secure.failures.is_empty());
    assert_eq!(secure.protected(), SENTENCES.len());
    assert_eq!(secure.leaked(), 0);
    assert!(!secure.breached());
    for verdict in &secure.verdicts {
        assert_eq!(verdict.verdict, Verdict::Protected);
        assert!(verdict.recovered.is_empty());
    }
}

#[tokio::test]
async fn every_document_is_paired_across_collections() {
    let (harness, store) = configured_harness().await;
    let documents =
        Document::with_policy(&DOCUMENTS[..], &IdPolicy::Sequence { prefix: "doc".into() });
    let report = harness.ingestion().ingest(&documents, &targets()).await.unwrap();
    assert_eq!(report.ingested.len(), DOCUMENTS.len());

    let expected: BTreeSet<String> = documents.iter().map(|d| d.id.clone()).collect();
    let raw: BTreeSet<String> =
        store.scroll("raw", 100).await.unwrap().into_iter().map(|r| r.id).collect();
    let secure: BTreeSet<String> =
        store.scroll("secure", 100).await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(raw, expected);
    assert_eq!(secure, expected);
    assert!(expected.contains("doc-0001"));
    assert!(expected.contains("doc-0010"));
}

#[tokio::test]
async fn comparison_batch_produces_bounded_metrics() {
    let (harness, _store) = configured_harness().await;
    let documents = Document::with_policy(&DOCUMENTS[..], &IdPolicy::ContentHash);
    harness.ingestion().ingest(&documents, &targets()).await.unwrap();

    let batch = harness.comparator().compare_batch(&QUERIES[..], "raw", "secure").await;
    assert!(batch.failures.is_empty());
    assert_eq!(batch.records.len(), QUERIES.len());
    for record in &batch.records {
        assert_eq!(record.plain.len(), 10);
        assert_eq!(record.encrypted.len(), 10);
        let metrics = record.metrics;
        assert!((0.0..=1.0).contains(&metrics.top_k_overlap));
        if let Some(rho) = metrics.rank_correlation {
            assert!((-1.0..=1.0).contains(&rho));
        }
        if let Some(r) = metrics.score_correlation {
            assert!((-1.0..=1.0).contains(&r));
        }
    }

    let summary = batch.summary;
    assert_eq!(summary.queries, QUERIES.len());
    let overlap = summary.mean_top_k_overlap.unwrap();
    assert!((0.0..=1.0).contains(&overlap));
    assert!(summary.rank_defined <= QUERIES.len());
    assert!(summary.score_defined <= QUERIES.len());
    assert_eq!(summary.mean_rank_correlation.is_some(), summary.rank_defined > 0);
    assert_eq!(summary.mean_score_correlation.is_some(), summary.score_defined > 0);
    assert!(summary.verdict().is_some());
}

#[tokio::test]
async fn identity_transform_gives_perfect_agreement() {
    let oracle = IdentityOracle { settings: tokio::sync::RwLock::new(None) };
    let (harness, _store) = harness_with(Arc::new(oracle)).await;
    harness.configure_oracle().await.unwrap();
    harness.ingestion().prepare_collections(&targets()).await.unwrap();
    let documents = Document::with_policy(&DOCUMENTS[..], &IdPolicy::ContentHash);
    harness.ingestion().ingest(&documents, &targets()).await.unwrap();

    let record = harness.comparator().compare(QUERIES[0], "raw", "secure").await.unwrap();
    assert_eq!(record.plain, record.encrypted);
    assert_eq!(record.metrics.top_k_overlap, 1.0);
    assert!((record.metrics.rank_correlation.unwrap() - 1.0).abs() < 1e-12);
}

#[tokio::test]
async fn one_failing_document_does_not_abort_ingestion() {
    let oracle = FlakyOracle { inner: LocalOracle::new(), calls: AtomicUsize::new(0), fail_on: 1 };
    let (harness, store) = harness_with(Arc::new(oracle)).await;
    harness.configure_oracle().await.unwrap();
    harness.ingestion().prepare_collections(&targets()).await.unwrap();

    let documents = vec![
        Document::new("D1", SENTENCES[0]),
        Document::new("D2", SENTENCES[1]),
        Document::new("D3", SENTENCES[2]),
    ];
    let report = harness.ingestion().ingest(&documents, &targets()).await.unwrap();

    assert!(!report.is_complete());
    let ingested: Vec<&str> = report.ingested.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ingested, vec!["D1", "D3"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "D2");
    match &report.failures[0].error {
        ProbeError::Pipeline(message) => {
            assert!(message.contains("D2"));
            assert!(message.contains("secure"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The plain write preceded the failed encryption.
    let secure: Vec<String> =
        store.scroll("secure", 100).await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(secure, vec!["D1", "D3"]);
    assert_eq!(store.scroll("raw", 100).await.unwrap().len(), 3);
}

#[tokio::test]
async fn unconfigured_oracle_fails_each_encrypted_write() {
    let (harness, _store) = harness_with(Arc::new(LocalOracle::new())).await;
    harness.ingestion().prepare_collections(&targets()).await.unwrap();

    let documents = Document::with_policy(&SENTENCES[..2], &IdPolicy::ContentHash);
    let report = harness.ingestion().ingest(&documents, &targets()).await.unwrap();
    assert!(report.ingested.is_empty());
    assert_eq!(report.failures.len(), 2);
    for failure in &report.failures {
        assert!(failure.error.to_string().contains("not configured"));
    }
}

#[tokio::test]
async fn ingestion_requires_a_target() {
    let (harness, _store) = configured_harness().await;
    let err = harness.ingestion().ingest(&[Document::new("D1", "text")], &[]).await.unwrap_err();
    assert!(matches!(err, ProbeError::Config(_)));
}

#[tokio::test]
async fn comparison_against_missing_collection_is_collected() {
    let (harness, _store) = configured_harness().await;
    let batch = harness.comparator().compare_batch(&QUERIES[..2], "raw", "absent").await;
    assert!(batch.records.is_empty());
    let failed: Vec<&str> = batch.failures.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(failed, QUERIES[..2].to_vec());
    assert_eq!(batch.summary.queries, 0);
    assert_eq!(batch.summary.verdict(), None);
}

#[tokio::test]
async fn records_without_text_are_reported_not_graded() {
    let (harness, store) = configured_harness().await;
    let documents = Document::with_policy(&SENTENCES[..1], &IdPolicy::ContentHash);
    harness.ingestion().ingest(&documents, &targets()).await.unwrap();
    let blank =
        StoredRecord { id: "zz-blank".into(), vector: vec![0.01; DIM], payload: HashMap::new() };
    store.upsert("raw", &[blank]).await.unwrap();

    let inverter = Arc::new(
        CorpusInverter::build(harness.embedding_provider().clone(), &SENTENCES[..]).await.unwrap(),
    );
    let report =
        harness.attacker(inverter).attack_collection("raw", AttackMode::Unprotected).await.unwrap();

    assert_eq!(report.verdicts.len(), 1);
    assert_eq!(report.verdicts[0].verdict, Verdict::Recovered);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "zz-blank");
}

#[tokio::test]
async fn depth_beyond_available_results_is_a_config_error() {
    let (harness, _store) = configured_harness().await;
    let documents = Document::with_policy(&SENTENCES[..3], &IdPolicy::ContentHash);
    harness.ingestion().ingest(&documents, &targets()).await.unwrap();

    let comparator = harness.comparator();
    let record = comparator.compare_at(SENTENCES[0], "raw", "secure", 3).await.unwrap();
    assert_eq!(record.plain[0].id, documents[0].id);
    assert_eq!(record.encrypted[0].id, documents[0].id);

    let err = comparator.compare_at(SENTENCES[0], "raw", "secure", 4).await.unwrap_err();
    assert!(matches!(err, ProbeError::Config(_)));
}
