// tests/run_e2e.rs
//
// Full-run scenario with fake collaborators: candidates in, one accepted
// story out, both candidates marked, a single delivery call carrying the
// rendered digest.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use hn_digest_curator::article::ArticleSource;
use hn_digest_curator::config::{AppConfig, SmtpConfig};
use hn_digest_curator::digest::DigestRunner;
use hn_digest_curator::hn::{CandidateItem, Comment, StorySource};
use hn_digest_curator::notify::DigestDelivery;
use hn_digest_curator::oracle::ScriptedOracle;
use hn_digest_curator::store::ItemStore;

struct FakeSource(Vec<CandidateItem>);

#[async_trait::async_trait]
impl StorySource for FakeSource {
    async fn front_page(&self, _limit: usize) -> Result<Vec<CandidateItem>> {
        Ok(self.0.clone())
    }
    async fn comments(&self, _story_id: &str) -> Result<Vec<Comment>> {
        Ok(vec![])
    }
    fn name(&self) -> &'static str {
        "fake"
    }
}

struct NoArticles;

#[async_trait::async_trait]
impl ArticleSource for NoArticles {
    async fn fetch(&self, _url: &str) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct RecordingDelivery {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl DigestDelivery for RecordingDelivery {
    async fn send(&self, subject: &str, html_body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), html_body.to_string()));
        Ok(())
    }
}

struct BrokenDelivery;

#[async_trait::async_trait]
impl DigestDelivery for BrokenDelivery {
    async fn send(&self, _subject: &str, _html_body: &str) -> Result<()> {
        anyhow::bail!("smtp relay rejected the message")
    }
}

fn config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        database_path: PathBuf::from(":memory:"),
        trigger_secret: "s".to_string(),
        quota: 10,
        expiry_days: 7,
        pacing: Duration::ZERO,
        candidate_limit: 30,
        feedback_base_url: "http://localhost:8000".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        smtp: SmtpConfig {
            host: "smtp.example.com".to_string(),
            user: "u".to_string(),
            pass: "p".to_string(),
            from: "a@example.com".to_string(),
            to: "b@example.com".to_string(),
        },
    })
}

fn scenario_candidates() -> Vec<CandidateItem> {
    vec![
        CandidateItem {
            id: "1".into(),
            title: "New AI model released".into(),
            url: None,
            score: 500,
            comment_count: 120,
            created_at: 0,
        },
        CandidateItem {
            id: "2".into(),
            title: "Gardening tips".into(),
            url: None,
            score: 900,
            comment_count: 40,
            created_at: 0,
        },
    ]
}

#[tokio::test]
async fn digest_run_end_to_end() {
    let store = Arc::new(ItemStore::open_in_memory().unwrap());
    store.replace_interests(&["AI".into()]).unwrap();

    let oracle = Arc::new(
        ScriptedOracle::new("YES, squarely within your AI interest")
            .rule("Gardening tips", "NO, unrelated to your interests"),
    );
    let delivery = Arc::new(RecordingDelivery::default());

    let runner = DigestRunner::new(
        store.clone(),
        oracle,
        Arc::new(NoArticles),
        Arc::new(FakeSource(scenario_candidates())),
        delivery.clone(),
        config(),
    );

    let report = runner.run_once().await.expect("run");
    assert_eq!(report.candidates, 2);
    assert_eq!(report.accepted, 1);
    assert!(report.delivered);

    // Both ids were evaluated and marked.
    let markers = store.processed_markers().unwrap();
    assert!(markers.contains_key("1"));
    assert!(markers.contains_key("2"));

    // One delivery call, carrying only the accepted story.
    let sent = delivery.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (subject, html) = &sent[0];
    assert!(subject.contains("1 stories"));
    assert!(html.contains("New AI model released"));
    assert!(!html.contains("Gardening tips"));
    assert!(html.contains("/feedback?story=1&rating=positive"));
}

#[tokio::test]
async fn run_refuses_to_start_without_interests() {
    let store = Arc::new(ItemStore::open_in_memory().unwrap());
    let runner = DigestRunner::new(
        store,
        Arc::new(ScriptedOracle::new("YES")),
        Arc::new(NoArticles),
        Arc::new(FakeSource(scenario_candidates())),
        Arc::new(RecordingDelivery::default()),
        config(),
    );

    let err = runner.run_once().await.expect_err("must fail");
    assert!(err.to_string().contains("no interests configured"));
}

#[tokio::test]
async fn delivery_failure_is_fatal_for_the_run() {
    let store = Arc::new(ItemStore::open_in_memory().unwrap());
    store.replace_interests(&["AI".into()]).unwrap();

    let runner = DigestRunner::new(
        store,
        Arc::new(ScriptedOracle::new("YES")),
        Arc::new(NoArticles),
        Arc::new(FakeSource(scenario_candidates())),
        Arc::new(BrokenDelivery),
        config(),
    );

    let err = runner.run_once().await.expect_err("delivery error surfaces");
    assert!(format!("{err:#}").contains("digest delivery failed"));
}
