//! One-shot digest run for cron-style scheduling. Exits non-zero when the
//! run fails (no interests configured, source unreachable, delivery error).

use std::sync::Arc;

use hn_digest_curator::article::ArticleFetcher;
use hn_digest_curator::config::AppConfig;
use hn_digest_curator::digest::DigestRunner;
use hn_digest_curator::hn::HnClient;
use hn_digest_curator::notify::EmailSender;
use hn_digest_curator::oracle::OpenAiOracle;
use hn_digest_curator::{init_tracing, ItemStore};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = ?e, "digest run failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Arc::new(AppConfig::from_env()?);
    let store = Arc::new(ItemStore::open(&config.database_path)?);

    let runner = DigestRunner::new(
        store,
        Arc::new(OpenAiOracle::from_env(None)?),
        Arc::new(ArticleFetcher::new()),
        Arc::new(HnClient::new()?),
        Arc::new(EmailSender::new(&config.smtp)?),
        config,
    );

    let report = runner.run_once().await?;
    tracing::info!(
        candidates = report.candidates,
        accepted = report.accepted,
        purged = report.purged_markers,
        delivered = report.delivered,
        "digest run finished"
    );
    Ok(())
}
