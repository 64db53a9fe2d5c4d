// src/enrich.rs
//! Enrichment for accepted stories: a narrative summary and a key-terms
//! explainer (two independent prompts, run concurrently and joined), plus a
//! best-effort topic-tag extraction. All parsing of the oracle's free text
//! happens here and tolerates minor formatting drift.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::hn::{CandidateItem, Comment};
use crate::oracle::Oracle;

/// Per-run enrichment of one accepted story.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub summary: String,
    pub key_terms: String,
    pub topics: Vec<String>,
}

const COMMENT_SNIPPETS: usize = 3;
const COMMENT_SNIPPET_CHARS: usize = 300;

/// Top-level comments by score, truncated, for summary context.
pub fn comment_snippets(comments: &[Comment]) -> Vec<String> {
    let mut top: Vec<&Comment> = comments.iter().collect();
    top.sort_by(|a, b| b.score.cmp(&a.score));
    top.iter()
        .take(COMMENT_SNIPPETS)
        .map(|c| {
            let text: String = c.text.chars().take(COMMENT_SNIPPET_CHARS).collect();
            format!("{}: {}", c.author, text)
        })
        .collect()
}

fn summary_prompt(item: &CandidateItem, article_text: Option<&str>, comments: &[Comment]) -> String {
    let mut p = String::with_capacity(2048);
    p.push_str("Summarize this Hacker News story in 2-3 sentences for a daily digest email.\n");
    p.push_str(&format!("Title: {}\n", item.title));
    if let Some(text) = article_text {
        p.push_str(&format!("Article text: {text}\n"));
    }
    let snippets = comment_snippets(comments);
    if !snippets.is_empty() {
        p.push_str("Top comments:\n");
        for s in snippets {
            p.push_str(&format!("- {s}\n"));
        }
    }
    p.push_str("Plain prose, no preamble.\n");
    p
}

fn key_terms_prompt(item: &CandidateItem, article_text: Option<&str>) -> String {
    let mut p = String::with_capacity(1024);
    p.push_str(
        "Explain the 3-5 technical terms a reader needs to follow this story. \
         One per line, formatted as **Term**: explanation.\n",
    );
    p.push_str(&format!("Title: {}\n", item.title));
    if let Some(text) = article_text {
        p.push_str(&format!("Article text: {text}\n"));
    }
    p
}

fn topics_prompt(item: &CandidateItem) -> String {
    format!(
        "Give 2-4 short topic tags for this story as a comma-separated list, \
         nothing else.\nTitle: {}\n",
        item.title
    )
}

/// Keep only `**Term**: explanation` bullet lines; if the oracle ignored the
/// format entirely, fall back to its raw answer.
pub fn parse_key_terms(answer: &str) -> String {
    static RE_TERM: OnceCell<Regex> = OnceCell::new();
    let re = RE_TERM.get_or_init(|| Regex::new(r"^\s*[-*]?\s*\*\*.+?\*\*\s*:").unwrap());

    let bullets: Vec<&str> = answer
        .lines()
        .map(str::trim)
        .filter(|l| re.is_match(l))
        .collect();
    if bullets.is_empty() {
        answer.trim().to_string()
    } else {
        bullets.join("\n")
    }
}

/// Comma-separated topic list, tolerant of bullets, quotes and a trailing
/// period. Empty entries are dropped.
pub fn parse_topics(answer: &str) -> Vec<String> {
    let line = answer.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    line.split(',')
        .map(|t| {
            t.trim()
                .trim_start_matches(['-', '*', ' '])
                .trim_matches(['"', '\'', '.', ' '])
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Run the two independent enrichment prompts concurrently, then the topic
/// tags. Summary or key-terms failure is the caller's signal to drop the
/// story from the digest; topic failure only costs the tags.
pub async fn enrich(
    oracle: &dyn Oracle,
    item: &CandidateItem,
    article_text: Option<&str>,
    comments: &[Comment],
) -> Result<Enrichment> {
    // The prompts must outlive both futures up to the join.
    let summary_p = summary_prompt(item, article_text, comments);
    let terms_p = key_terms_prompt(item, article_text);
    let (summary, terms) = tokio::join!(oracle.complete(&summary_p), oracle.complete(&terms_p));

    let summary = summary.context("summary prompt")?.trim().to_string();
    let key_terms = parse_key_terms(&terms.context("key-terms prompt")?);

    let topics = match oracle.complete(&topics_prompt(item)).await {
        Ok(answer) => parse_topics(&answer),
        Err(e) => {
            tracing::warn!(story_id = %item.id, error = ?e, "topic tagging failed");
            Vec::new()
        }
    };

    Ok(Enrichment {
        summary,
        key_terms,
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;

    #[tokio::test]
    async fn enrich_joins_summary_and_key_terms() {
        let oracle = ScriptedOracle::new("fallback")
            .rule("Summarize", "A short summary of the story.")
            .rule("technical terms", "**WAL**: write-ahead log.")
            .rule("topic tags", "rust, storage");
        let item = CandidateItem {
            id: "7".into(),
            title: "A new storage engine".into(),
            url: Some("https://example.com/engine".into()),
            score: 100,
            comment_count: 10,
            created_at: 0,
        };

        let out = enrich(&oracle, &item, Some("article body"), &[])
            .await
            .expect("enrichment");
        assert_eq!(out.summary, "A short summary of the story.");
        assert!(out.key_terms.contains("**WAL**"));
        assert_eq!(out.topics, vec!["rust", "storage"]);
        assert_eq!(oracle.calls().len(), 3);
    }

    #[test]
    fn key_terms_keeps_bold_bullets() {
        let answer = "Here are the terms:\n\
            - **WAL**: write-ahead log used for durability.\n\
            Some filler line.\n\
            **MVCC**: multi-version concurrency control.\n";
        let out = parse_key_terms(answer);
        assert!(out.contains("**WAL**"));
        assert!(out.contains("**MVCC**"));
        assert!(!out.contains("filler"));
    }

    #[test]
    fn key_terms_falls_back_to_raw_answer() {
        let answer = "WAL is a write-ahead log. MVCC is concurrency control.";
        assert_eq!(parse_key_terms(answer), answer);
    }

    #[test]
    fn topics_tolerate_formatting() {
        assert_eq!(
            parse_topics("rust, databases, distributed systems."),
            vec!["rust", "databases", "distributed systems"]
        );
        assert_eq!(
            parse_topics("\n- \"AI\", 'compilers'\n"),
            vec!["AI", "compilers"]
        );
        assert!(parse_topics("").is_empty());
    }

    #[test]
    fn snippets_pick_highest_scored() {
        let mk = |author: &str, score: i64| Comment {
            author: author.into(),
            text: "text".into(),
            score,
            children: vec![],
        };
        let snippets = comment_snippets(&[mk("a", 1), mk("b", 9), mk("c", 5), mk("d", 7)]);
        assert_eq!(snippets.len(), 3);
        assert!(snippets[0].starts_with("b:"));
        assert!(snippets[1].starts_with("d:"));
    }
}
