use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use ai_client::{util::search_prompt, Claude};
use aio_common::{Assistant, CitationResult};

use super::{array_at, log_disabled, resolve, str_at, CitationProvider};

pub struct ClaudeCitations {
    client: Option<Claude>,
}

impl ClaudeCitations {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            log_disabled(Assistant::Claude, "ANTHROPIC_API_KEY");
        }
        Self {
            client: api_key.map(Claude::new),
        }
    }

    pub fn with_client(client: Claude) -> Self {
        Self {
            client: Some(client),
        }
    }
}

#[async_trait]
impl CitationProvider for ClaudeCitations {
    fn assistant(&self) -> Assistant {
        Assistant::Claude
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
            Assistant::Claude,
            keyword,
            lang,
            response,
            extract_citations,
            extract_answer,
        )))
    }
}

/// URLs from `web_search_tool_result` blocks, then from text-block citations.
pub fn extract_citations(response: &Value) -> Vec<String> {
    let blocks = array_at(response, "content");

    let searched = blocks
        .iter()
        .filter(|b| str_at(b, "type") == Some("web_search_tool_result"))
        .flat_map(|b| array_at(b, "content"))
        .filter_map(|r| str_at(r, "url"));

    let cited = blocks
        .iter()
        .filter(|b| str_at(b, "type") == Some("text"))
        .flat_map(|b| array_at(b, "citations"))
        .filter_map(|c| str_at(c, "url"));

    searched.chain(cited).map(str::to_string).collect()
}

/// Concatenated text blocks.
pub fn extract_answer(response: &Value) -> String {
    array_at(response, "content")
        .iter()
        .filter(|b| str_at(b, "type") == Some("text"))
        .filter_map(|b| str_at(b, "text"))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response() -> Value {
        json!({
            "content": [
                {"type": "server_tool_use", "name": "web_search", "input": {"query": "weather"}},
                {"type": "web_search_tool_result", "content": [
                    {"type": "web_search_result", "url": "https://weather.com/today-forecast"},
                    {"type": "web_search_result", "url": "https://openweathermap.org/current"}
                ]},
                {"type": "text", "text": "Expect sun. ", "citations": [
                    {"type": "web_search_result_location", "url": "https://weather.com/today-forecast"}
                ]},
                {"type": "text", "text": "Highs near 20C."}
            ]
        })
    }

    #[test]
    fn result_blocks_and_text_citations_are_collected() {
        let citations = extract_citations(&response());
        assert_eq!(citations.len(), 3);
        assert_eq!(citations[0], "https://weather.com/today-forecast");
        assert_eq!(citations[2], "https://weather.com/today-forecast");
    }

    #[test]
    fn answer_joins_text_blocks() {
        assert_eq!(extract_answer(&response()), "Expect sun. Highs near 20C.");
    }

    #[test]
    fn missing_content_yields_nothing() {
        assert!(extract_citations(&json!({"type": "error"})).is_empty());
    }
}
