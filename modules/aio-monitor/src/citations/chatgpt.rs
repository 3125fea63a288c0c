use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use ai_client::{util::search_prompt, OpenAi};
use aio_common::{Assistant, CitationResult};

use super::{array_at, log_disabled, resolve, str_at, CitationProvider};

pub struct ChatGptCitations {
    client: Option<OpenAi>,
}

impl ChatGptCitations {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            log_disabled(Assistant::ChatGpt, "OPENAI_API_KEY");
        }
        Self {
            client: api_key.map(OpenAi::new),
        }
    }

    pub fn with_client(client: OpenAi) -> Self {
        Self {
            client: Some(client),
        }
    }
}

#[async_trait]
impl CitationProvider for ChatGptCitations {
    fn assistant(&self) -> Assistant {
        Assistant::ChatGpt
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
            Assistant::ChatGpt,
            keyword,
            lang,
            response,
            extract_citations,
            extract_answer,
        )))
    }
}

fn message(response: &Value) -> Option<&Value> {
    response.get("choices")?.get(0)?.get("message")
}

/// Citation URLs from web search tool calls and url annotations.
pub fn extract_citations(response: &Value) -> Vec<String> {
    let Some(message) = message(response) else {
        return Vec::new();
    };

    let from_tool_calls = array_at(message, "tool_calls")
        .iter()
        .filter_map(|call| call.get("web_search"))
        .flat_map(|search| array_at(search, "results"))
        .filter_map(|result| str_at(result, "url"));

    let from_annotations = array_at(message, "annotations")
        .iter()
        .filter_map(|annotation| match str_at(annotation, "type") {
            Some("url") => str_at(annotation, "url"),
            Some("url_citation") => annotation
                .get("url_citation")
                .and_then(|c| str_at(c, "url"))
                .or_else(|| str_at(annotation, "url")),
            _ => None,
        });

    from_tool_calls
        .chain(from_annotations)
        .map(str::to_string)
        .collect()
}

pub fn extract_answer(response: &Value) -> String {
    message(response)
        .and_then(|m| str_at(m, "content"))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn annotations_and_tool_calls_are_collected() {
        let response = json!({
            "choices": [{
                "message": {
                    "content": "Today will be sunny.",
                    "tool_calls": [{
                        "web_search": {"results": [{"url": "https://weather.com/today"}]}
                    }],
                    "annotations": [
                        {"type": "url_citation", "url_citation": {"url": "https://www.weather.gov/"}},
                        {"type": "url", "url": "https://tenki.jp/"},
                        {"type": "file_citation", "file_id": "f1"}
                    ]
                }
            }]
        });
        assert_eq!(
            extract_citations(&response),
            vec![
                "https://weather.com/today",
                "https://www.weather.gov/",
                "https://tenki.jp/"
            ]
        );
        assert_eq!(extract_answer(&response), "Today will be sunny.");
    }

    #[test]
    fn unexpected_shape_yields_nothing() {
        let response = json!({"error": {"message": "rate limited"}});
        assert!(extract_citations(&response).is_empty());
        assert_eq!(extract_answer(&response), "");
    }

    #[tokio::test]
    async fn disabled_without_key() {
        let provider = ChatGptCitations::new(None);
        assert!(!provider.is_enabled());
        assert_eq!(provider.check_citations("weather", "en").await.unwrap(), None);
    }
}
