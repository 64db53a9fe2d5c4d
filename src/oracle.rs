// src/oracle.rs
//! Text-completion oracle behind a narrow trait so the classifier and the
//! enrichment prompts stay testable with a scripted stand-in. The oracle is
//! imprecise and rate-limited by nature; callers treat its answers as a soft
//! signal and parse its free text on our side.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    /// One prompt in, free text out. Errors are per-call; the pipeline logs
    /// and skips the item rather than aborting the batch.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions client. Requires `OPENAI_API_KEY`.
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiOracle {
    /// `model_override`: pass Some("gpt-4o") to override; defaults to gpt-4o-mini.
    pub fn from_env(model_override: Option<&str>) -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY missing from environment")?;
        let http = reqwest::Client::builder()
            .user_agent("hn-digest-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("oracle request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("oracle returned {status}");
        }
        let body: Resp = resp.json().await.context("parse oracle response")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            anyhow::bail!("oracle returned an empty completion");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Scripted oracle for tests and local dry runs: answers by the first
/// substring rule that matches the prompt, falling back to a default.
/// Every prompt is recorded so tests can assert what was (not) asked.
pub struct ScriptedOracle {
    rules: Vec<(String, String)>,
    default: String,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default: default.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rule(mut self, needle: impl Into<String>, answer: impl Into<String>) -> Self {
        self.rules.push((needle.into(), answer.into()));
        self
    }

    /// Prompts seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(prompt.to_string());
        for (needle, answer) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return Ok(answer.clone());
            }
        }
        Ok(self.default.clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
