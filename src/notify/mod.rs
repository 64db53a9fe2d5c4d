// src/notify/mod.rs
pub mod email;

use anyhow::Result;

/// Delivery collaborator: one call per digest run carrying the fully
/// rendered output. A failure here is fatal for the run — the computed
/// digest has no other propagation path.
#[async_trait::async_trait]
pub trait DigestDelivery: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()>;
}

pub use email::EmailSender;
