mod client;
pub(crate) mod types;

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use client::OpenAiClient;
use types::{ChatMessage, ChatRequest, WebSearchOptions};

pub const DEFAULT_MODEL: &str = "gpt-4o-search-preview";

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout: Duration::from_secs(60),
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

    fn client(&self) -> Result<OpenAiClient> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;
        let client = OpenAiClient::new(&self.api_key, http);
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    /// One chat completion with web search enabled. Returns the raw response.
    pub async fn web_search(&self, prompt: &str) -> Result<Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            web_search_options: WebSearchOptions::default(),
        };
        self.client()?.chat(&request).await
    }
}
