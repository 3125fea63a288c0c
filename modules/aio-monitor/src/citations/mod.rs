pub mod chatgpt;
pub mod claude;
pub mod gemini;

pub use chatgpt::ChatGptCitations;
pub use claude::ClaudeCitations;
pub use gemini::GeminiCitations;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use aio_common::{matches, Assistant, CitationResult};

const EXCERPT_CHARS: usize = 200;

/// A web-search-enabled assistant asked which URLs it would cite for a keyword.
///
/// Unlike search providers, implementations do not retry: a failed call
/// degrades to a synthetic answer inside the provider.
#[async_trait]
pub trait CitationProvider: Send + Sync {
    fn assistant(&self) -> Assistant;

    /// False when no credential was configured.
    fn is_enabled(&self) -> bool;

    /// `None` when the provider is disabled.
    async fn check_citations(&self, keyword: &str, lang: &str) -> Result<Option<CitationResult>>;

    fn check_target_domain_match(&self, citations: &[String], targets: &[String]) -> bool {
        !targets.is_empty() && citations.iter().any(|url| matches(url, targets))
    }
}

/// Drop repeated URLs, keeping first-seen order.
pub fn dedup_urls<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect()
}

pub(crate) fn citation_result(
    assistant: Assistant,
    citations: Vec<String>,
    answer: &str,
) -> CitationResult {
    let citations = dedup_urls(citations);
    let excerpt = ai_client::util::take_chars(answer.trim(), EXCERPT_CHARS).to_string();
    CitationResult {
        assistant,
        answer_present: !citations.is_empty() || !excerpt.is_empty(),
        citations,
        excerpt,
    }
}

/// Fixed offline answer used when the backend call fails.
pub fn synthetic_result(assistant: Assistant, keyword: &str, lang: &str) -> CitationResult {
    let ja = lang == "ja";
    let (citations, excerpt): ([&str; 3], String) = match assistant {
        Assistant::ChatGpt => (
            [
                "https://en.wikipedia.org/wiki/Weather",
                "https://www.weather.gov/",
                "https://example.com/weather-info",
            ],
            if ja {
                format!("「{keyword}」に関する情報です。ChatGPTのWeb検索機能を使用して最新情報を取得しました...")
            } else {
                format!("Here's information about \"{keyword}\" found using ChatGPT's web search feature...")
            },
        ),
        Assistant::Claude => (
            [
                "https://example.com/weather-today",
                "https://weather.com/today-forecast",
                "https://openweathermap.org/current",
            ],
            if ja {
                format!("{keyword}に関する情報をウェブから取得しました。今日の天気予報は...")
            } else {
                format!("Here's what I found about \"{keyword}\" from web sources. Today's weather forecast shows...")
            },
        ),
        Assistant::Gemini => (
            [
                "https://support.google.com/",
                "https://blog.google/",
                "https://example.com/gemini-info",
            ],
            if ja {
                format!("「{keyword}」について、Geminiのグラウンディング機能を使用して最新情報を取得しました...")
            } else {
                format!("Information about \"{keyword}\" retrieved using Gemini's grounding with Google Search...")
            },
        ),
    };

    CitationResult {
        assistant,
        citations: citations.iter().map(|c| c.to_string()).collect(),
        excerpt,
        answer_present: true,
    }
}

/// Turn a raw backend response into a [`CitationResult`], or the synthetic
/// answer when the call failed.
pub(crate) fn resolve(
    assistant: Assistant,
    keyword: &str,
    lang: &str,
    response: Result<Value>,
    citations: fn(&Value) -> Vec<String>,
    answer: fn(&Value) -> String,
) -> CitationResult {
    match response {
        Ok(body) => {
            let result = citation_result(assistant, citations(&body), &answer(&body));
            debug!(
                keyword,
                %assistant,
                citations = result.citations.len(),
                "Assistant answered"
            );
            result
        }
        Err(e) => {
            warn!(
                keyword,
                %assistant,
                error = %format!("{e:#}"),
                "Assistant call failed, using synthetic answer"
            );
            synthetic_result(assistant, keyword, lang)
        }
    }
}

pub(crate) fn log_disabled(assistant: Assistant, env_var: &str) {
    info!(%assistant, "{env_var} not set, {assistant} citations disabled");
}

/// String at `value[key]`, if it is one.
pub(crate) fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Array at `value[key]`, empty when missing or not an array.
pub(crate) fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde_json::json;

    use super::*;

    struct Stub;

    #[async_trait]
    impl CitationProvider for Stub {
        fn assistant(&self) -> Assistant {
            Assistant::Claude
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn check_citations(&self, _: &str, _: &str) -> Result<Option<CitationResult>> {
            Ok(None)
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let deduped = dedup_urls(urls(&["https://b.com", "https://a.com", "https://b.com", ""]));
        assert_eq!(deduped, urls(&["https://b.com", "https://a.com"]));
    }

    #[test]
    fn excerpt_is_capped_at_two_hundred_chars() {
        let answer = "晴".repeat(500);
        let result = citation_result(Assistant::Gemini, vec![], &answer);
        assert_eq!(result.excerpt.chars().count(), 200);
        assert!(result.answer_present);
    }

    #[test]
    fn empty_answer_is_not_present() {
        let result = citation_result(Assistant::ChatGpt, vec![], "  ");
        assert!(!result.answer_present);
        assert!(result.excerpt.is_empty());
    }

    #[test]
    fn target_match_uses_domain_rule() {
        let citations = urls(&["https://news.weather.com/a", "https://other.org"]);
        assert!(Stub.check_target_domain_match(&citations, &urls(&["weather.com"])));
        assert!(!Stub.check_target_domain_match(&citations, &urls(&["ather.com"])));
        assert!(!Stub.check_target_domain_match(&citations, &[]));
    }

    #[test]
    fn failed_call_falls_back_to_synthetic_answer() {
        let result = resolve(
            Assistant::Gemini,
            "天気",
            "ja",
            Err(anyhow!("connection reset")),
            |_| vec![],
            |_| String::new(),
        );
        assert_eq!(result, synthetic_result(Assistant::Gemini, "天気", "ja"));
        assert!(result.excerpt.contains("「天気」"));
        assert_eq!(result.citations[1], "https://blog.google/");
    }

    #[test]
    fn successful_call_uses_extractors() {
        let result = resolve(
            Assistant::Claude,
            "weather",
            "en",
            Ok(json!({"url": "https://weather.com/x", "text": "Sunny"})),
            |v| str_at(v, "url").map(str::to_string).into_iter().collect(),
            |v| str_at(v, "text").unwrap_or_default().to_string(),
        );
        assert_eq!(result.citations, urls(&["https://weather.com/x"]));
        assert_eq!(result.excerpt, "Sunny");
    }

    #[test]
    fn synthetic_excerpt_is_localized() {
        let en = synthetic_result(Assistant::ChatGpt, "weather", "en");
        assert!(en.excerpt.starts_with("Here's information about \"weather\""));
        assert!(en.answer_present);
        assert_eq!(en.citations.len(), 3);
    }
}
