use anyhow::{anyhow, Result};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

use super::types::MessagesRequest;
use crate::util::take_chars;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Error bodies are cut to this many characters before they reach an error.
const ERROR_BODY_CHARS: usize = 500;

pub(crate) struct ClaudeClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, http: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// POST one web-search turn to `/messages` and hand back the raw body.
    ///
    /// Search results and citations are spread over several content block
    /// types, so the body stays untyped for the caller to walk.
    pub async fn messages(&self, request: &MessagesRequest) -> Result<Value> {
        debug!(model = %request.model, "Claude web search request");

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Claude API error ({status}): {}",
                take_chars(&body, ERROR_BODY_CHARS)
            ));
        }

        let body: Value = response.json().await?;
        check_body(&body)?;
        Ok(body)
    }
}

/// A 200 can still carry an `error` object, or stop before the search turn
/// finished.
fn check_body(body: &Value) -> Result<()> {
    if body.get("type").and_then(Value::as_str) == Some("error") {
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(anyhow!("Claude API error: {message}"));
    }
    if body.get("stop_reason").and_then(Value::as_str) == Some("pause_turn") {
        warn!("Claude paused the web search turn, citations may be incomplete");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn in_body_error_is_rejected() {
        let body = json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}});
        let err = check_body(&body).unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn paused_turn_is_kept() {
        let body = json!({"type": "message", "stop_reason": "pause_turn", "content": []});
        assert!(check_body(&body).is_ok());
    }
}
