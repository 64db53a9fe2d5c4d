// src/hn.rs
//! Content source: ranked front-page candidates plus a per-story comment
//! tree. The concrete client talks to the Algolia Hacker News API; the
//! digest pipeline only sees the `StorySource` trait.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One story from the source, not yet judged. Immutable once fetched; only
/// its id is ever persisted (as a processed marker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: String,
    pub title: String,
    /// Absent for discussion-only stories (Ask HN and similar).
    pub url: Option<String>,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: i64, // unix seconds
}

/// One node of a story's comment tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub score: i64,
    pub children: Vec<Comment>,
}

#[async_trait::async_trait]
pub trait StorySource: Send + Sync {
    /// Ranked front-page candidates, in the source's own order.
    async fn front_page(&self, limit: usize) -> Result<Vec<CandidateItem>>;

    /// The story's comment tree (top-level comments with nested children).
    async fn comments(&self, story_id: &str) -> Result<Vec<Comment>>;

    fn name(&self) -> &'static str;
}

pub struct HnClient {
    http: reqwest::Client,
    base: String,
}

impl HnClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("hn-digest-curator/0.1")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            base: "https://hn.algolia.com/api/v1".to_string(),
        })
    }

    /// Point the client at a different base URL (local stub server in tests).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[derive(Deserialize)]
struct SearchResp {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    points: Option<i64>,
    num_comments: Option<i64>,
    created_at_i: Option<i64>,
}

#[derive(Deserialize)]
struct ItemNode {
    author: Option<String>,
    text: Option<String>,
    points: Option<i64>,
    #[serde(default)]
    children: Vec<ItemNode>,
}

fn node_to_comment(node: ItemNode) -> Option<Comment> {
    let text = crate::article::strip_markup(&node.text?);
    if text.is_empty() {
        return None;
    }
    Some(Comment {
        author: node.author.unwrap_or_else(|| "unknown".to_string()),
        text,
        score: node.points.unwrap_or(0),
        children: node
            .children
            .into_iter()
            .filter_map(node_to_comment)
            .collect(),
    })
}

#[async_trait::async_trait]
impl StorySource for HnClient {
    async fn front_page(&self, limit: usize) -> Result<Vec<CandidateItem>> {
        let url = format!(
            "{}/search?tags=front_page&hitsPerPage={}",
            self.base, limit
        );
        let resp: SearchResp = self
            .http
            .get(&url)
            .send()
            .await
            .context("fetch front page")?
            .error_for_status()
            .context("front page status")?
            .json()
            .await
            .context("parse front page")?;

        Ok(resp
            .hits
            .into_iter()
            .filter_map(|h| {
                let title = h.title?;
                Some(CandidateItem {
                    id: h.object_id,
                    title,
                    url: h.url.filter(|u| !u.is_empty()),
                    score: h.points.unwrap_or(0),
                    comment_count: h.num_comments.unwrap_or(0),
                    created_at: h.created_at_i.unwrap_or(0),
                })
            })
            .collect())
    }

    async fn comments(&self, story_id: &str) -> Result<Vec<Comment>> {
        let url = format!("{}/items/{}", self.base, story_id);
        let root: ItemNode = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("fetch comments for story {story_id}"))?
            .error_for_status()
            .context("comments status")?
            .json()
            .await
            .context("parse comment tree")?;

        Ok(root
            .children
            .into_iter()
            .filter_map(node_to_comment)
            .collect())
    }

    fn name(&self) -> &'static str {
        "hn-algolia"
    }
}
