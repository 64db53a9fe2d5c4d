// src/article.rs
//! Best-effort article text extraction: given a URL, return plain text or
//! nothing. Any failure (timeout, non-HTML, bad status) degrades to `None`;
//! this collaborator never raises to the pipeline.

use std::time::Duration;

use once_cell::sync::OnceCell;
use regex::Regex;

/// Character budget for extracted article text.
pub const ARTICLE_CHAR_BUDGET: usize = 5000;

#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}

pub struct ArticleFetcher {
    http: reqwest::Client,
}

impl ArticleFetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("hn-digest-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self { http }
    }
}

impl Default for ArticleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ArticleSource for ArticleFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        let resp = self.http.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            tracing::debug!(url = %url, status = %resp.status(), "article fetch non-success");
            return None;
        }
        let html = resp.text().await.ok()?;
        let text = strip_markup(&html);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Reduce HTML to plain text: drop script/style blocks, strip tags, decode
/// entities, collapse whitespace, cap at the character budget.
pub fn strip_markup(html: &str) -> String {
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript|head)\b.*?</(script|style|noscript|head)>")
            .unwrap()
    });
    let mut out = re_blocks.replace_all(html, " ").to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = html_escape::decode_html_entities(&out).to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > ARTICLE_CHAR_BUDGET {
        out = out.chars().take(ARTICLE_CHAR_BUDGET).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_drops_scripts_and_tags() {
        let html = r#"<html><head><title>x</title></head>
            <body><script>var a = 1;</script><p>Hello &amp; <b>world</b>!</p></body></html>"#;
        assert_eq!(strip_markup(html), "Hello & world !");
    }

    #[test]
    fn strip_markup_caps_length() {
        let html = format!("<p>{}</p>", "a".repeat(ARTICLE_CHAR_BUDGET + 500));
        assert_eq!(strip_markup(&html).chars().count(), ARTICLE_CHAR_BUDGET);
    }

    #[test]
    fn strip_markup_empty_input() {
        assert_eq!(strip_markup("<div><script>x</script></div>"), "");
    }
}
