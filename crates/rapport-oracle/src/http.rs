//! Messages-API oracle over blocking HTTP.
//!
//! The transport is compiled only with the `http` feature. Without it the
//! adapter still constructs (so configuration errors surface early) but
//! reports itself unavailable and every call returns `OracleError::Disabled`.

use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};

use rapport_core::config::OracleConfig;
use rapport_core::errors::OracleError;
use rapport_core::tracing::metrics;
use rapport_core::traits::{Oracle, OracleJudgment, OracleRequest};

use crate::cost::{CostReport, CostTable, CostTracker, Usage};
use crate::prompts::PromptRegistry;
use crate::response::parse_response;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UsageBlock {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: UsageBlock,
}

/// Pull the first text block and the token usage out of a Messages API reply.
pub fn read_reply(body: &str) -> Result<(String, Usage), OracleError> {
    let reply: MessagesReply = serde_json::from_str(body).map_err(|e| OracleError::InvalidResponse {
        reason: format!("malformed API reply: {e}"),
    })?;
    let text = reply
        .content
        .into_iter()
        .filter(|b| b.kind.is_empty() || b.kind == "text")
        .find_map(|b| b.text)
        .ok_or_else(|| OracleError::InvalidResponse {
            reason: "API reply has no text content".to_string(),
        })?;
    Ok((
        text,
        Usage::new(reply.usage.input_tokens, reply.usage.output_tokens),
    ))
}

#[derive(Debug)]
pub struct HttpOracle {
    config: OracleConfig,
    api_key: String,
    registry: PromptRegistry,
    costs: CostTracker,
    #[cfg(feature = "http")]
    client: reqwest::blocking::Client,
}

impl HttpOracle {
    /// Build from config. The API key is read from the configured env var.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let key_env = config.effective_api_key_env();
        let api_key = std::env::var(key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OracleError::Transport {
                reason: format!("API key env var {key_env} is not set"),
            })?;

        #[cfg(feature = "http")]
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(config.effective_timeout_ms()))
            .gzip(true)
            .build()
            .map_err(|e: reqwest::Error| OracleError::Transport {
                reason: e.to_string(),
            })?;

        Ok(Self {
            config: config.clone(),
            api_key,
            registry: PromptRegistry::new(),
            costs: CostTracker::new(CostTable::from_config(config)),
            #[cfg(feature = "http")]
            client,
        })
    }

    pub fn model(&self) -> &str {
        self.config.effective_model()
    }

    pub fn cost_report(&self) -> CostReport {
        self.costs.report()
    }

    /// JSON body for one Messages API call.
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.effective_model(),
            "max_tokens": self.config.effective_max_tokens(),
            "messages": [{ "role": "user", "content": prompt }],
        })
    }

    #[cfg(feature = "http")]
    fn post(&self, body: &Value) -> Result<String, OracleError> {
        let resp = self
            .client
            .post(self.config.effective_endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .map_err(|e: reqwest::Error| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        timeout_ms: self.config.effective_timeout_ms(),
                    }
                } else {
                    OracleError::Transport {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::Quota {
                reason: format!("HTTP {status}: {text}"),
            });
        }
        if !status.is_success() {
            return Err(OracleError::Transport {
                reason: format!("HTTP {status}: {text}"),
            });
        }
        Ok(text)
    }

    #[cfg(not(feature = "http"))]
    fn post(&self, _body: &Value) -> Result<String, OracleError> {
        let _ = &self.api_key;
        Err(OracleError::Disabled)
    }
}

impl Oracle for HttpOracle {
    fn name(&self) -> &str {
        "http"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "http")
    }

    fn validate(&self, request: &OracleRequest) -> Result<Vec<OracleJudgment>, OracleError> {
        if request.messages.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = self
            .registry
            .render(request)
            .ok_or_else(|| OracleError::InvalidResponse {
                reason: format!("no prompt template {}", request.prompt_template_id),
            })?;

        let started = Instant::now();
        let body = self.post(&self.request_body(&prompt))?;
        let (text, usage) = read_reply(&body)?;
        self.costs.record(request.category, usage);

        tracing::debug!(
            { metrics::ORACLE_BATCH_SIZE } = request.messages.len(),
            { metrics::ORACLE_CALL_TIME_MS } = started.elapsed().as_millis() as u64,
            category = %request.category,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "oracle call complete"
        );
        parse_response(&text, request)
    }
}
