mod client;
pub(crate) mod types;

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use client::ClaudeClient;
use types::{MessagesRequest, UserMessage, WebSearchTool};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
    max_tokens: u32,
}

impl Claude {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout: Duration::from_secs(90),
            max_tokens: 1024,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> Result<ClaudeClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;
        let client = ClaudeClient::new(&self.api_key, http);
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    /// One message turn with the server-side web search tool attached.
    pub async fn web_search(&self, prompt: &str) -> Result<Value> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![UserMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            tools: vec![WebSearchTool::default()],
        };
        self.client()?.messages(&request).await
    }
}
