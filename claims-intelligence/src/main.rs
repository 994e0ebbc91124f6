use claims_flow::InMemorySessionStorage;
use claims_intelligence::{
    AppState,
    audit::AuditLogger,
    config::ServiceConfig,
    create_app,
    extract::DocumentExtractor,
    llm::OpenRouterClient,
    retrieval::{FastEmbedder, PolicyIndex},
    workflow::WorkflowDeps,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "claims_intelligence=debug,claims_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

fn load_policy_index(config: &ServiceConfig) -> PolicyIndex {
    if !config.policy_index_path.exists() {
        warn!(
            path = %config.policy_index_path.display(),
            "Policy index not found, quote chat will answer without policy clauses"
        );
        return PolicyIndex::new();
    }
    match PolicyIndex::load(&config.policy_index_path) {
        Ok(index) => index,
        Err(e) => {
            warn!(error = %e, "Policy index unreadable, starting with an empty index");
            PolicyIndex::new()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServiceConfig::from_env()?;
    info!(
        model = %config.llm_model,
        audit_log = %config.audit_log_path.display(),
        session_ttl_secs = config.session_ttl.as_secs(),
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    info!(upload_dir = %config.upload_dir.display(), "Accepting claim documents from upload directory");

    let session_storage = Arc::new(InMemorySessionStorage::with_ttl(config.session_ttl));
    let deps = WorkflowDeps {
        llm: Arc::new(OpenRouterClient::new(
            &config.openrouter_api_key,
            config.llm_model.clone(),
            config.llm_timeout,
        )),
        extractor: Arc::new(DocumentExtractor::new(
            config.openrouter_api_key.clone(),
            config.ocr_model.clone(),
            config.llm_timeout,
        )),
        upload_dir: config.upload_dir.clone(),
        audit: Arc::new(AuditLogger::new(config.audit_log_path.clone())),
        index: Arc::new(load_policy_index(&config)),
        embedder: Arc::new(FastEmbedder::load().await?),
        retrieval_top_k: config.retrieval_top_k,
    };

    // Idle sessions are evicted on access; this sweeps the ones nobody touches again.
    let sweeper = session_storage.clone();
    let sweep_every = (config.session_ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            let purged = sweeper.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = sweeper.len(), "Expired sessions purged");
            }
        }
    });

    let app = create_app(AppState::new(&deps, session_storage));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
