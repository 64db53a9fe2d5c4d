// src/config.rs
//! Process configuration, loaded once from the environment and threaded
//! explicitly into the digest runner and the HTTP handlers. No ambient
//! globals: handlers and the assembler only see what they are given.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// SMTP settings for digest delivery.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file shared by the feedback service and the batch run.
    pub database_path: PathBuf,
    /// Shared secret guarding /trigger-digest and interest mutations.
    pub trigger_secret: String,
    /// Maximum accepted stories per digest run.
    pub quota: usize,
    /// Processed markers older than this are purged and become eligible again.
    pub expiry_days: i64,
    /// Delay between classified items, to respect the oracle's rate limits.
    pub pacing: Duration,
    /// How many front-page candidates to pull per run.
    pub candidate_limit: usize,
    /// Public base URL used for feedback links in the rendered email.
    pub feedback_base_url: String,
    pub bind_addr: String,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    /// Read configuration from the environment. Missing mandatory values are
    /// fatal; optional knobs fall back to the documented defaults.
    pub fn from_env() -> Result<Self> {
        let smtp = SmtpConfig {
            host: required("SMTP_HOST")?,
            user: required("SMTP_USER")?,
            pass: required("SMTP_PASS")?,
            from: required("DIGEST_EMAIL_FROM")?,
            to: required("DIGEST_EMAIL_TO")?,
        };

        Ok(Self {
            database_path: PathBuf::from(
                std::env::var("DIGEST_DB").unwrap_or_else(|_| "digest.db".to_string()),
            ),
            trigger_secret: required("DIGEST_SECRET")?,
            quota: parse_or("DIGEST_QUOTA", 10),
            expiry_days: parse_or("PROCESSED_EXPIRY_DAYS", 7),
            pacing: Duration::from_millis(parse_or("CLASSIFY_PACING_MS", 1000)),
            candidate_limit: parse_or("FRONT_PAGE_LIMIT", 30),
            feedback_base_url: std::env::var("FEEDBACK_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            smtp,
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} missing from environment"))
}

fn parse_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
