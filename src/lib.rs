// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod article;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod digest;
pub mod enrich;
pub mod hn;
pub mod metrics;
pub mod notify;
pub mod oracle;
pub mod profile;
pub mod render;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::digest::{DigestAssembler, DigestRunner, DigestTrigger};
pub use crate::store::ItemStore;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the tracing subscriber for a binary. Call once, early in main.
/// `RUST_LOG` controls the filter; defaults to info for this crate.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hn_digest_curator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
