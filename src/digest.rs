// src/digest.rs
//! Digest assembly: dedupe, rank, classify until the accept quota is met,
//! enrich accepted stories, mark everything touched as processed, deliver.
//! Single-item failures never abort the batch; a delivery failure does.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, gauge};

use crate::article::ArticleSource;
use crate::classify;
use crate::config::AppConfig;
use crate::dedup::filter_unseen;
use crate::enrich;
use crate::hn::{CandidateItem, StorySource};
use crate::notify::DigestDelivery;
use crate::oracle::Oracle;
use crate::profile::InterestProfile;
use crate::render;
use crate::store::{FeedbackLog, ItemStore};

/// Static content policy: job ads never reach the classifier. Matching is
/// case-insensitive substring over the title.
const HIRING_KEYWORDS: &[&str] = &[
    "is hiring",
    "hiring",
    "job posting",
    "who's hiring",
    "whos hiring",
];

pub fn is_hiring_post(title: &str) -> bool {
    let lower = title.to_lowercase();
    HIRING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Per-run result for one accepted story. Never persisted as a unit; only
/// the processed marker survives the run.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub item: CandidateItem,
    pub accepted: bool,
    pub reason: String,
    pub summary: Option<String>,
    pub key_terms: Option<String>,
    pub topics: Vec<String>,
}

pub struct DigestAssembler {
    store: Arc<ItemStore>,
    oracle: Arc<dyn Oracle>,
    articles: Arc<dyn ArticleSource>,
    /// When present, accepted stories get comment context in their summary.
    source: Option<Arc<dyn StorySource>>,
    quota: usize,
    pacing: Duration,
}

impl DigestAssembler {
    pub fn new(
        store: Arc<ItemStore>,
        oracle: Arc<dyn Oracle>,
        articles: Arc<dyn ArticleSource>,
    ) -> Self {
        Self {
            store,
            oracle,
            articles,
            source: None,
            quota: 10,
            pacing: Duration::from_secs(1),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn StorySource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    /// Delay between classified items. Zero disables pacing (tests).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// One digest pass over a candidate batch. Stops classifying as soon as
    /// the quota is met; candidates past that point get no marker and stay
    /// eligible for the next run.
    pub async fn run(
        &self,
        profile: &InterestProfile,
        feedback: &FeedbackLog,
        candidates: Vec<CandidateItem>,
    ) -> Result<Vec<DigestEntry>> {
        crate::metrics::describe_series();

        let total = candidates.len();
        counter!("digest_candidates_total").increment(total as u64);

        let markers = self.store.processed_markers()?;
        let unseen = filter_unseen(candidates, &markers);
        let dedup_skipped = total - unseen.len();
        counter!("digest_dedup_skipped_total").increment(dedup_skipped as u64);

        let before_policy = unseen.len();
        let mut batch: Vec<CandidateItem> =
            unseen.into_iter().filter(|c| !is_hiring_post(&c.title)).collect();
        counter!("digest_hiring_filtered_total")
            .increment((before_policy - batch.len()) as u64);

        // Stable sort: ties keep the source's own (recency/rank) order.
        batch.sort_by(|a, b| b.score.cmp(&a.score));

        tracing::info!(
            total,
            dedup_skipped,
            eligible = batch.len(),
            quota = self.quota,
            "digest batch ready"
        );

        let mut entries = Vec::new();
        for item in batch {
            if entries.len() >= self.quota {
                break;
            }

            let article_text = match &item.url {
                Some(url) => self.articles.fetch(url).await,
                None => None,
            };

            counter!("digest_classified_total").increment(1);
            let verdict =
                match classify::classify(self.oracle.as_ref(), &item, article_text.as_deref(), profile, feedback)
                    .await
                {
                    Ok(v) => v,
                    Err(e) => {
                        // No marker: a story the oracle never judged stays
                        // eligible for the next run.
                        counter!("oracle_errors_total").increment(1);
                        tracing::warn!(story_id = %item.id, error = ?e, "classification failed, skipping");
                        self.pace().await;
                        continue;
                    }
                };

            if verdict.accepted {
                let comments = match &self.source {
                    Some(src) => src.comments(&item.id).await.unwrap_or_default(),
                    None => Vec::new(),
                };
                match enrich::enrich(
                    self.oracle.as_ref(),
                    &item,
                    article_text.as_deref(),
                    &comments,
                )
                .await
                {
                    Ok(enrichment) => {
                        counter!("digest_accepted_total").increment(1);
                        tracing::info!(story_id = %item.id, title = %item.title, "story accepted");
                        entries.push(DigestEntry {
                            item: item.clone(),
                            accepted: true,
                            reason: verdict.reason,
                            summary: Some(enrichment.summary),
                            key_terms: Some(enrichment.key_terms),
                            topics: enrichment.topics,
                        });
                    }
                    Err(e) => {
                        // Degrade gracefully: the story is marked processed
                        // but dropped from the digest output.
                        tracing::warn!(story_id = %item.id, error = ?e, "enrichment failed, dropping story");
                    }
                }
            } else {
                tracing::debug!(story_id = %item.id, reason = %verdict.reason, "story rejected");
            }

            self.store.mark_processed(&item.id)?;
            self.pace().await;
        }

        Ok(entries)
    }

    async fn pace(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}

/// Outcome of one full run, for logs and the batch binary's exit report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub candidates: usize,
    pub accepted: usize,
    pub purged_markers: usize,
    pub delivered: bool,
}

/// Everything a full digest run needs, wired once at process start.
#[derive(Clone)]
pub struct DigestRunner {
    store: Arc<ItemStore>,
    oracle: Arc<dyn Oracle>,
    articles: Arc<dyn ArticleSource>,
    source: Arc<dyn StorySource>,
    delivery: Arc<dyn DigestDelivery>,
    config: Arc<AppConfig>,
}

impl DigestRunner {
    pub fn new(
        store: Arc<ItemStore>,
        oracle: Arc<dyn Oracle>,
        articles: Arc<dyn ArticleSource>,
        source: Arc<dyn StorySource>,
        delivery: Arc<dyn DigestDelivery>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            oracle,
            articles,
            source,
            delivery,
            config,
        }
    }

    /// Fetch, filter, classify, enrich, deliver. An empty interest profile
    /// is a fatal precondition; an empty digest skips delivery.
    pub async fn run_once(&self) -> Result<RunReport> {
        crate::metrics::describe_series();
        counter!("digest_runs_total").increment(1);

        let purged_markers = self.store.purge_expired(self.config.expiry_days)?;
        if purged_markers > 0 {
            tracing::info!(purged_markers, "expired processed markers removed");
        }

        let profile = InterestProfile::load(&self.store)?;
        if profile.is_empty() {
            anyhow::bail!("no interests configured; refusing to run an unfiltered digest");
        }
        let feedback = self.store.load_feedback()?;

        let candidates = self
            .source
            .front_page(self.config.candidate_limit)
            .await
            .context("fetch candidates")?;
        let candidate_count = candidates.len();

        let assembler = DigestAssembler::new(
            self.store.clone(),
            self.oracle.clone(),
            self.articles.clone(),
        )
        .with_source(self.source.clone())
        .with_quota(self.config.quota)
        .with_pacing(self.config.pacing);

        let entries = assembler.run(&profile, &feedback, candidates).await?;
        gauge!("digest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        if entries.is_empty() {
            tracing::info!("no stories accepted; skipping delivery");
            return Ok(RunReport {
                candidates: candidate_count,
                accepted: 0,
                purged_markers,
                delivered: false,
            });
        }

        let (subject, html) = render::render_digest(&entries, &self.config.feedback_base_url);
        self.delivery
            .send(&subject, &html)
            .await
            .context("digest delivery failed")?;

        tracing::info!(accepted = entries.len(), "digest delivered");
        Ok(RunReport {
            candidates: candidate_count,
            accepted: entries.len(),
            purged_markers,
            delivered: true,
        })
    }
}

/// Fire-and-forget seam for the /trigger-digest endpoint: the HTTP handler
/// must return immediately while the run proceeds detached.
pub trait DigestTrigger: Send + Sync {
    fn spawn_run(&self);
}

impl DigestTrigger for DigestRunner {
    fn spawn_run(&self) {
        let runner = self.clone();
        tokio::spawn(async move {
            match runner.run_once().await {
                Ok(report) => tracing::info!(
                    accepted = report.accepted,
                    delivered = report.delivered,
                    "triggered digest run finished"
                ),
                Err(e) => tracing::error!(error = ?e, "triggered digest run failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hiring_policy_is_case_insensitive() {
        assert!(is_hiring_post("Acme Corp is hiring backend engineers"));
        assert!(is_hiring_post("Who's Hiring - March"));
        assert!(!is_hiring_post("Higher-order functions in Rust"));
    }
}
