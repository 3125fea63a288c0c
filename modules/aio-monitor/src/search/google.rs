use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use aio_common::{
    normalize, AiOverview, AioSource, Device, Engine, Location, LocationType, SearchResult,
    SerpItem,
};
use serp_client::{SearchParams, SearchResponse, SerpApiClient};

use super::SearchProvider;
use crate::retry::RetryPolicy;

const MAX_RESULTS: usize = 100;

/// Google results via SerpAPI.
pub struct GoogleSearch {
    client: SerpApiClient,
    retry: RetryPolicy,
}

impl GoogleSearch {
    pub fn new(api_key: &str, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: SerpApiClient::new(api_key)?,
            retry,
        })
    }

    pub fn with_client(client: SerpApiClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    fn engine(&self) -> Engine {
        Engine::Google
    }

    async fn get_top100(
        &self,
        keyword: &str,
        lang: &str,
        location: &Location,
        device: Device,
    ) -> Result<SearchResult> {
        let params = SearchParams {
            query: keyword.to_string(),
            language: lang.to_string(),
            country: country_code(&location.value).to_string(),
            device: device.to_string(),
            location: (location.location_type == LocationType::City)
                .then(|| location.value.clone()),
            num: MAX_RESULTS as u32,
        };

        info!(keyword, engine = "google", %device, lang, "Fetching SERP");

        let client = &self.client;
        let params = &params;
        let result = self
            .retry
            .run(&format!("Google SERP for \"{keyword}\""), move || async move {
                let response = client.google(params).await?;
                Ok(search_result_from_response(response))
            })
            .await?;

        debug!(
            keyword,
            organic = result.organic.len(),
            aio = result.aio.is_some(),
            "Google SERP parsed"
        );
        Ok(result)
    }
}

/// `gl` country code for a location name. Unknown names fall back to `us`.
pub fn country_code(location_value: &str) -> &'static str {
    match location_value.trim() {
        "Japan" | "Tokyo" | "JP" => "jp",
        "United States" | "US" => "us",
        "United Kingdom" | "GB" | "UK" => "gb",
        "Germany" | "DE" => "de",
        "France" | "FR" => "fr",
        _ => "us",
    }
}

/// Convert a raw SerpAPI response. The AI Overview block wins; an answer box
/// with sources is the fallback; otherwise there is no AIO.
pub fn search_result_from_response(response: SearchResponse) -> SearchResult {
    let aio = if let Some(ref overview) = response.ai_overview {
        Some(AiOverview {
            present: true,
            sources: overview.links().map(source_for).collect(),
            text_length: overview.text.as_ref().map(|t| t.chars().count()),
            has_followup: !overview.followup_questions.is_empty(),
        })
    } else {
        response
            .answer_box
            .as_ref()
            .and_then(|answer| {
                answer.sources.as_ref().map(|sources| (answer, sources))
            })
            .map(|(answer, sources)| AiOverview {
                present: true,
                sources: sources
                    .iter()
                    .filter_map(|s| s.link.as_deref())
                    .map(source_for)
                    .collect(),
                text_length: answer.text.as_ref().map(|t| t.chars().count()),
                has_followup: false,
            })
    };

    let organic = response
        .organic_results
        .into_iter()
        .filter(|r| !r.link.is_empty())
        .take(MAX_RESULTS)
        .enumerate()
        .map(|(i, r)| SerpItem {
            rank: r.position.unwrap_or(i as u32 + 1),
            domain: r
                .domain
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| normalize(&r.link)),
            url: r.link,
            title: r.title,
        })
        .collect();

    SearchResult {
        engine: Engine::Google,
        aio,
        organic,
    }
}

fn source_for(url: &str) -> AioSource {
    AioSource {
        url: url.to_string(),
        domain: normalize(url),
    }
}
