// src/metrics.rs
//! Prometheus exporter plus the one-time registration of every series the
//! crate emits, so /metrics carries help text even before a first increment.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Register descriptions for all counters and gauges. Safe to call from any
/// code path; only the first call does work.
pub fn describe_series() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_runs_total", "Digest runs started.");
        describe_counter!("digest_candidates_total", "Candidates pulled from the source.");
        describe_counter!(
            "digest_dedup_skipped_total",
            "Candidates dropped by the deduplication gate."
        );
        describe_counter!(
            "digest_hiring_filtered_total",
            "Candidates dropped by the hiring-keyword policy."
        );
        describe_counter!("digest_classified_total", "Stories judged by the oracle.");
        describe_counter!("digest_accepted_total", "Stories accepted into a digest.");
        describe_counter!("oracle_errors_total", "Failed oracle calls (skipped items).");
        describe_counter!(
            "feedback_received_total",
            "Feedback judgments recorded over HTTP."
        );
        describe_gauge!("digest_last_run_ts", "Unix ts when a digest run last finished.");
        describe_gauge!("digest_quota", "Configured accept quota per run.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder, register all series, and expose a
    /// static gauge for the configured accept quota.
    pub fn init(quota: usize) -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_series();
        gauge!("digest_quota").set(quota as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
