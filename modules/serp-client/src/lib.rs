pub mod error;
pub mod types;

pub use error::{Result, SerpError};
pub use types::{
    AiOverviewBlock, AnswerBox, OrganicResult, SearchParams, SearchResponse, SourceLink,
};

use std::time::Duration;

const BASE_URL: &str = "https://serpapi.com";
const USER_AGENT: &str = "aio-monitor/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub struct SerpApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch one Google results page. Non-2xx statuses and SerpAPI's in-body
    /// `error` field are both reported as [`SerpError::Api`], except the
    /// "no results" error which comes back as an empty response.
    pub async fn google(&self, params: &SearchParams) -> Result<SearchResponse> {
        let url = format!("{}/search", self.base_url);
        let num = params.num.to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("api_key", self.api_key.as_str()),
            ("engine", "google"),
            ("q", params.query.as_str()),
            ("hl", params.language.as_str()),
            ("gl", params.country.as_str()),
            ("device", params.device.as_str()),
            ("num", num.as_str()),
            ("start", "0"),
        ];
        if let Some(ref location) = params.location {
            query.push(("location", location.as_str()));
        }

        tracing::debug!(query = %params.query, hl = %params.language, gl = %params.country, device = %params.device, "SerpAPI request");

        let resp = self.client.get(&url).query(&query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SerpError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        tracing::debug!(bytes = body.len(), "SerpAPI response received");

        let parsed: SearchResponse = serde_json::from_str(&body)?;
        if let Some(message) = parsed.error.clone() {
            // An empty results page is an answer, not a failure.
            if message.contains("hasn't returned any results") {
                return Ok(parsed);
            }
            return Err(SerpError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(parsed)
    }
}
