// src/classify.rs
//! Relevance classifier: turns one candidate story plus the interest
//! profile and recent feedback into an accept/reject verdict. Stateless —
//! a pure function of its inputs modulo the oracle's non-determinism. The
//! pipeline around it (dedup gate, quota, feedback loop) is what absorbs
//! the occasional misclassification; no retry logic lives here.

use anyhow::Result;

use crate::hn::CandidateItem;
use crate::oracle::Oracle;
use crate::profile::InterestProfile;
use crate::store::{FeedbackLog, FeedbackRecord};

/// How many positive and negative exemplars the prompt carries. Fixed
/// window: older feedback is dropped, not summarized.
pub const FEEDBACK_EXEMPLAR_WINDOW: usize = 5;

/// How much article text the judgment prompt sees.
pub const EXCERPT_CHAR_BUDGET: usize = 1000;

#[derive(Debug, Clone)]
pub struct Verdict {
    pub accepted: bool,
    /// The oracle's full answer, verbatim, whatever the verdict.
    pub reason: String,
}

/// The most recent `FEEDBACK_EXEMPLAR_WINDOW` records, still in
/// chronological order. Input is expected oldest-first (store contract).
pub fn recent_exemplars(records: &[FeedbackRecord]) -> &[FeedbackRecord] {
    let start = records.len().saturating_sub(FEEDBACK_EXEMPLAR_WINDOW);
    &records[start..]
}

/// Assemble the judgment prompt. Kept as a pure function so tests can
/// assert exactly what the oracle is shown.
pub fn build_prompt(
    item: &CandidateItem,
    article_text: Option<&str>,
    profile: &InterestProfile,
    feedback: &FeedbackLog,
) -> String {
    let mut p = String::with_capacity(2048);

    p.push_str("You are curating a personal Hacker News digest.\n");
    p.push_str(&format!("My interests: {}\n", profile.interests.join(", ")));
    if !profile.excluded.is_empty() {
        p.push_str(&format!(
            "Avoid stories primarily about: {}\n",
            profile.excluded.join(", ")
        ));
    }

    let positive = recent_exemplars(&feedback.positive);
    if !positive.is_empty() {
        p.push_str("Stories I marked as interesting before:\n");
        for rec in positive {
            p.push_str(&format!("- {}\n", rec.title));
        }
    }
    let negative = recent_exemplars(&feedback.negative);
    if !negative.is_empty() {
        p.push_str("Stories I marked as not interesting:\n");
        for rec in negative {
            p.push_str(&format!("- {}\n", rec.title));
        }
    }

    p.push_str("\nCandidate story:\n");
    p.push_str(&format!("Title: {}\n", item.title));
    match &item.url {
        Some(url) => p.push_str(&format!("URL: {url}\n")),
        None => p.push_str("URL: (discussion only)\n"),
    }
    if let Some(text) = article_text {
        let excerpt: String = text.chars().take(EXCERPT_CHAR_BUDGET).collect();
        p.push_str(&format!("Article excerpt: {excerpt}\n"));
    }

    p.push_str(
        "\nWould this story interest me? Answer YES or NO as the first word, \
         then a one-sentence reason.\n",
    );
    p
}

/// True iff the answer's first token is YES (case-insensitive). Anything
/// else, including an ambiguous answer, counts as NO.
pub fn parse_accept(answer: &str) -> bool {
    answer
        .split_whitespace()
        .next()
        .map(|tok| {
            tok.trim_matches(|c: char| !c.is_ascii_alphanumeric())
                .eq_ignore_ascii_case("yes")
        })
        .unwrap_or(false)
}

pub async fn classify(
    oracle: &dyn Oracle,
    item: &CandidateItem,
    article_text: Option<&str>,
    profile: &InterestProfile,
    feedback: &FeedbackLog,
) -> Result<Verdict> {
    let prompt = build_prompt(item, article_text, profile, feedback);
    let answer = oracle.complete(&prompt).await?;
    Ok(Verdict {
        accepted: parse_accept(&answer),
        reason: answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Rating;

    fn item(title: &str, url: Option<&str>) -> CandidateItem {
        CandidateItem {
            id: "1".into(),
            title: title.into(),
            url: url.map(|u| u.to_string()),
            score: 100,
            comment_count: 10,
            created_at: 0,
        }
    }

    fn feedback_titled(rating: Rating, titles: &[&str]) -> Vec<FeedbackRecord> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| FeedbackRecord {
                story_id: format!("s{i}"),
                title: t.to_string(),
                url: None,
                rating,
                created_at: i as i64,
            })
            .collect()
    }

    #[test]
    fn parse_accept_variants() {
        assert!(parse_accept("YES"));
        assert!(parse_accept("yes, this matches your interests"));
        assert!(parse_accept("Yes. Distributed systems content."));
        assert!(!parse_accept("NO"));
        assert!(!parse_accept("no."));
        assert!(!parse_accept("Maybe, hard to say"));
        assert!(!parse_accept(""));
    }

    #[test]
    fn prompt_windows_feedback_to_five_most_recent() {
        let profile = InterestProfile {
            interests: vec!["rust".into()],
            excluded: vec![],
        };
        let feedback = FeedbackLog {
            positive: feedback_titled(
                Rating::Positive,
                &["old1", "old2", "keep1", "keep2", "keep3", "keep4", "keep5"],
            ),
            negative: vec![],
        };
        let p = build_prompt(&item("t", None), None, &profile, &feedback);
        for kept in ["keep1", "keep2", "keep3", "keep4", "keep5"] {
            assert!(p.contains(kept), "missing exemplar {kept}");
        }
        assert!(!p.contains("old1"));
        assert!(!p.contains("old2"));
        // chronological order preserved
        assert!(p.find("keep1").unwrap() < p.find("keep5").unwrap());
    }

    #[test]
    fn prompt_marks_discussion_only_and_excludes() {
        let profile = InterestProfile {
            interests: vec!["databases".into()],
            excluded: vec!["crypto".into()],
        };
        let p = build_prompt(
            &item("Ask HN: something", None),
            None,
            &profile,
            &FeedbackLog::default(),
        );
        assert!(p.contains("(discussion only)"));
        assert!(p.contains("Avoid stories primarily about: crypto"));
    }

    #[test]
    fn prompt_truncates_article_excerpt() {
        let profile = InterestProfile {
            interests: vec!["x".into()],
            excluded: vec![],
        };
        let long = "a".repeat(EXCERPT_CHAR_BUDGET + 200);
        let p = build_prompt(
            &item("t", Some("https://example.com")),
            Some(&long),
            &profile,
            &FeedbackLog::default(),
        );
        let excerpt_line = p
            .lines()
            .find(|l| l.starts_with("Article excerpt:"))
            .expect("excerpt line");
        assert!(excerpt_line.len() <= "Article excerpt: ".len() + EXCERPT_CHAR_BUDGET);
    }
}
