//! Feedback & Trigger Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the shared store, the digest runner
//! for on-demand triggers, and the Prometheus exporter.

use std::sync::Arc;

use hn_digest_curator::article::ArticleFetcher;
use hn_digest_curator::config::AppConfig;
use hn_digest_curator::digest::DigestRunner;
use hn_digest_curator::hn::HnClient;
use hn_digest_curator::metrics::Metrics;
use hn_digest_curator::notify::EmailSender;
use hn_digest_curator::oracle::OpenAiOracle;
use hn_digest_curator::{api, init_tracing, ItemStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    let store = Arc::new(ItemStore::open(&config.database_path)?);
    let metrics = Metrics::init(config.quota);

    let runner = DigestRunner::new(
        store.clone(),
        Arc::new(OpenAiOracle::from_env(None)?),
        Arc::new(ArticleFetcher::new()),
        Arc::new(HnClient::new()?),
        Arc::new(EmailSender::new(&config.smtp)?),
        config.clone(),
    );

    let state = api::AppState {
        store,
        config: config.clone(),
        trigger: Arc::new(runner),
    };
    let app = api::create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "digest feedback service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
