use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use ai_client::{util::search_prompt, Gemini};
use aio_common::{Assistant, CitationResult};

use super::{array_at, log_disabled, resolve, str_at, CitationProvider};

pub struct GeminiCitations {
    client: Option<Gemini>,
}

impl GeminiCitations {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            log_disabled(Assistant::Gemini, "GOOGLE_AI_API_KEY");
        }
        Self {
            client: api_key.map(Gemini::new),
        }
    }

    pub fn with_client(client: Gemini) -> Self {
        Self {
            client: Some(client),
        }
    }
}

#[async_trait]
impl CitationProvider for GeminiCitations {
    fn assistant(&self) -> Assistant {
        Assistant::Gemini
    }

    fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    async fn check_citations(&self, keyword: &str, lang: &str) -> Result<Option<CitationResult>> {
        let Some(ref client) = self.client else {
            return Ok(None);
        };
        let response = client.web_search(&search_prompt(keyword, lang)).await;
        Ok(Some(resolve(
            Assistant::Gemini,
            keyword,
            lang,
            response,
            extract_citations,
            extract_answer,
        )))
    }
}

/// Grounding chunk URIs, in chunk order, followed by the chunks referenced
/// from grounding supports. Duplicates are removed by the caller.
pub fn extract_citations(response: &Value) -> Vec<String> {
    let mut urls = Vec::new();

    for candidate in array_at(response, "candidates") {
        let Some(metadata) = candidate.get("groundingMetadata") else {
            continue;
        };
        let chunks = array_at(metadata, "groundingChunks");
        let uri = |chunk: &Value| {
            chunk
                .get("web")
                .and_then(|web| str_at(web, "uri"))
                .map(str::to_string)
        };

        urls.extend(chunks.iter().filter_map(uri));

        let supported = array_at(metadata, "groundingSupports")
            .iter()
            .flat_map(|support| array_at(support, "groundingChunkIndices"))
            .filter_map(Value::as_u64)
            .filter_map(|i| chunks.get(i as usize))
            .filter_map(uri);
        urls.extend(supported);
    }

    urls
}

/// Text parts of the first candidate.
pub fn extract_answer(response: &Value) -> String {
    array_at(response, "candidates")
        .first()
        .and_then(|c| c.get("content"))
        .map(|content| {
            array_at(content, "parts")
                .iter()
                .filter_map(|p| str_at(p, "text"))
                .collect()
        })
        .unwrap_or_default()
}
