use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vecprobe::{
    AttackMode, AttackReport, CollectionTarget, CorpusInverter, Document, EmbeddingProvider,
    Endpoints, Harness, HarnessConfig, HashEmbeddingProvider, HttpEncryptionOracle, HttpInverter,
    IdPolicy, Inverter, OpenAIEmbeddingProvider, OracleRoutes, QdrantRestStore,
};

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

const ATTACK_SENTENCES: [&str; 5] = [
    "The cat sat on the mat.",
    "Paris is the capital of France.",
    "Machine learning uses neural networks.",
    "The Eiffel Tower is located in Paris.",
    "Water freezes at zero degrees Celsius.",
];

fn log_attack(collection: &str, report: &AttackReport) {
    for verdict in &report.verdicts {
        info!(
            collection,
            id = %verdict.id,
            original = %verdict.original,
            recovered = %verdict.recovered,
            verdict = ?verdict.verdict,
            "inversion result"
        );
    }
    info!(
        collection,
        recovered = report.recovered(),
        partial = report.partial(),
        garbage = report.garbage(),
        protected = report.protected(),
        leaked = report.leaked(),
        failed = report.failures.len(),
        breached = report.breached(),
        "attack summary"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = HarnessConfig::default();
    let endpoints = Endpoints::from_env();

    let embedder: Arc<dyn EmbeddingProvider> = match OpenAIEmbeddingProvider::from_env() {
        Ok(provider) => Arc::new(provider.with_dimensions(config.dimension())),
        Err(e) => {
            warn!(error = %e, "falling back to the hashing embedder");
            Arc::new(HashEmbeddingProvider::new(config.dimension()))
        }
    };

    let mut oracle =
        HttpEncryptionOracle::new(&endpoints.oracle_url).with_routes(OracleRoutes::vault());
    if let Some(token) = &endpoints.oracle_token {
        oracle = oracle.with_token(token);
    }

    let harness = Harness::builder()
        .config(config)
        .embedding_provider(embedder.clone())
        .oracle(Arc::new(oracle))
        .vector_store(Arc::new(QdrantRestStore::new(&endpoints.store_url)))
        .build()?;
    harness.configure_oracle().await?;

    // Ranking fidelity over the search corpus.
    let proof_targets =
        [CollectionTarget::plain("proof_raw"), CollectionTarget::encrypted("proof_encrypted")];
    let documents = Document::with_policy(&DOCUMENTS[..], &IdPolicy::ContentHash);
    harness.ingestion().prepare_collections(&proof_targets).await?;
    let ingested = harness.ingestion().ingest(&documents, &proof_targets).await?;
    info!(
        ingested = ingested.ingested.len(),
        failed = ingested.failures.len(),
        "search corpus ready"
    );

    let batch =
        harness.comparator().compare_batch(&QUERIES[..], "proof_raw", "proof_encrypted").await;
    let summary = batch.summary;
    info!(
        queries = summary.queries,
        failed = batch.failures.len(),
        mean_top_k_overlap = ?summary.mean_top_k_overlap,
        mean_rank_correlation = ?summary.mean_rank_correlation,
        rank_defined = summary.rank_defined,
        mean_score_correlation = ?summary.mean_score_correlation,
        score_defined = summary.score_defined,
        fidelity = ?summary.verdict(),
        "search fidelity"
    );

    // Inversion against raw and protected storage.
    let attack_targets =
        [CollectionTarget::plain("raw_documents"), CollectionTarget::encrypted("secure_documents")];
    let sentences = Document::with_policy(&ATTACK_SENTENCES[..], &IdPolicy::ContentHash);
    harness.ingestion().prepare_collections(&attack_targets).await?;
    let attack_corpus = harness.ingestion().ingest(&sentences, &attack_targets).await?;
    info!(
        ingested = attack_corpus.ingested.len(),
        failed = attack_corpus.failures.len(),
        "attack corpus ready"
    );

    let inverter: Arc<dyn Inverter> = match std::env::var("INVERSION_URL") {
        Ok(url) => Arc::new(HttpInverter::new(url)),
        Err(_) => Arc::new(CorpusInverter::build(embedder, &ATTACK_SENTENCES[..]).await?),
    };
    let attacker = harness.attacker(inverter);

    let raw = attacker.attack_collection("raw_documents", AttackMode::Unprotected).await?;
    log_attack("raw_documents", &raw);
    let secure = attacker.attack_collection("secure_documents", AttackMode::Protected).await?;
    log_attack("secure_documents", &secure);

    if secure.breached() {
        warn!("protected collection leaked source text");
    } else {
        info!("protected collection resisted inversion");
    }
    Ok(())
}
