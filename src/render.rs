// src/render.rs
//! HTML rendering of the digest email: one section per accepted story with
//! title link, counters, summary, key terms, topic labels, and feedback
//! links back into the /feedback endpoint.

use html_escape::encode_text;
use url::form_urlencoded;

use crate::digest::DigestEntry;
use crate::store::Rating;

/// Build (subject, html body) for one digest run.
pub fn render_digest(entries: &[DigestEntry], feedback_base_url: &str) -> (String, String) {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    let subject = format!("Hacker News digest {date} ({} stories)", entries.len());

    let mut html = String::with_capacity(8192);
    html.push_str("<html><body style=\"font-family:sans-serif;max-width:680px\">");
    html.push_str(&format!("<h1>Your Hacker News digest — {date}</h1>"));

    for entry in entries {
        let item = &entry.item;
        html.push_str("<div style=\"margin-bottom:28px\">");

        let title = encode_text(&item.title);
        match &item.url {
            Some(url) => html.push_str(&format!(
                "<h2><a href=\"{}\">{title}</a></h2>",
                encode_text(url)
            )),
            None => html.push_str(&format!(
                "<h2><a href=\"https://news.ycombinator.com/item?id={}\">{title}</a></h2>",
                encode_text(&item.id)
            )),
        }

        html.push_str(&format!(
            "<p style=\"color:#666\">{} points · {} comments · \
             <a href=\"https://news.ycombinator.com/item?id={}\">discussion</a></p>",
            item.score,
            item.comment_count,
            encode_text(&item.id)
        ));

        if !entry.topics.is_empty() {
            html.push_str("<p>");
            for topic in &entry.topics {
                html.push_str(&format!(
                    "<span style=\"background:#eee;border-radius:3px;padding:2px 6px;\
                     margin-right:6px;font-size:12px\">{}</span>",
                    encode_text(topic)
                ));
            }
            html.push_str("</p>");
        }

        if let Some(summary) = &entry.summary {
            html.push_str(&format!("<p>{}</p>", encode_text(summary)));
        }

        if let Some(key_terms) = entry.key_terms.as_deref().filter(|t| !t.is_empty()) {
            html.push_str("<p style=\"font-size:13px;color:#444\">");
            for line in key_terms.lines() {
                html.push_str(&format!("{}<br>", encode_text(line)));
            }
            html.push_str("</p>");
        }

        html.push_str(&format!(
            "<p style=\"font-size:13px\">\
             <a href=\"{}\">&#128077; more like this</a> &nbsp; \
             <a href=\"{}\">&#128078; less like this</a></p>",
            feedback_link(feedback_base_url, entry, Rating::Positive),
            feedback_link(feedback_base_url, entry, Rating::Negative),
        ));

        html.push_str("</div>");
    }

    html.push_str("</body></html>");
    (subject, html)
}

fn feedback_link(base: &str, entry: &DigestEntry, rating: Rating) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("story", &entry.item.id);
    query.append_pair("rating", rating.as_str());
    query.append_pair("title", &entry.item.title);
    if let Some(url) = &entry.item.url {
        query.append_pair("url", url);
    }
    format!("{}/feedback?{}", base.trim_end_matches('/'), query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hn::CandidateItem;

    fn entry(id: &str, title: &str) -> DigestEntry {
        DigestEntry {
            item: CandidateItem {
                id: id.into(),
                title: title.into(),
                url: Some("https://example.com/a?b=1".into()),
                score: 120,
                comment_count: 34,
                created_at: 0,
            },
            accepted: true,
            reason: "YES".into(),
            summary: Some("A summary with <tags> in it.".into()),
            key_terms: Some("**WAL**: write-ahead log".into()),
            topics: vec!["databases".into()],
        }
    }

    #[test]
    fn render_escapes_and_links_feedback() {
        let (subject, html) = render_digest(
            &[entry("42", "Story about <script> safety")],
            "https://digest.example.com/",
        );
        assert!(subject.contains("(1 stories)"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("https://digest.example.com/feedback?story=42&rating=positive"));
        assert!(html.contains("rating=negative"));
        assert!(html.contains("databases"));
    }

    #[test]
    fn discussion_only_story_links_to_hn() {
        let mut e = entry("7", "Ask HN: anything");
        e.item.url = None;
        let (_, html) = render_digest(&[e], "http://localhost:8000");
        assert!(html.contains("news.ycombinator.com/item?id=7"));
    }
}
