//! Real providers against a local HTTP stub.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ai_client::{Claude, Gemini, OpenAi};
use aio_common::{Assistant, Device, Location};
use aio_monitor::citations::{
    synthetic_result, ChatGptCitations, CitationProvider, ClaudeCitations, GeminiCitations,
};
use aio_monitor::retry::RetryPolicy;
use aio_monitor::search::{GoogleSearch, SearchProvider};
use serp_client::SerpApiClient;

fn google_against(server: &MockServer, attempts: u32) -> GoogleSearch {
    let client = SerpApiClient::new("test-key")
        .unwrap()
        .with_base_url(&server.uri());
    GoogleSearch::with_client(client, RetryPolicy::new(attempts, Duration::from_millis(1)))
}

async fn fetch(google: &GoogleSearch) -> anyhow::Result<aio_common::SearchResult> {
    google
        .get_top100("weather", "en", &Location::country("United States"), Device::Desktop)
        .await
}

#[tokio::test]
async fn server_error_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let err = fetch(&google_against(&server, 3)).await.unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("Google SERP for \"weather\""));
    assert!(message.contains("3 attempts"));
    assert!(message.contains("500"));
    server.verify().await;
}

#[tokio::test]
async fn transient_error_recovers_on_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("engine", "google"))
        .and(query_param("num", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ai_overview": {
                "text": "Sunny all day.",
                "sources": [{"title": "Weather", "link": "https://weather.com/today"}]
            },
            "organic_results": [
                {"position": 1, "title": "Weather", "link": "https://www.weather.com/"}
            ]
        })))
        .mount(&server)
        .await;

    let result = fetch(&google_against(&server, 3)).await.unwrap();

    let aio = result.aio.unwrap();
    assert_eq!(aio.sources[0].url, "https://weather.com/today");
    assert_eq!(result.organic.len(), 1);
    assert_eq!(result.organic[0].rank, 1);
}

#[tokio::test]
async fn empty_results_page_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Google hasn't returned any results for this query."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetch(&google_against(&server, 3)).await.unwrap();

    assert!(result.aio.is_none());
    assert!(result.organic.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn in_body_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Invalid API key."
        })))
        .expect(2)
        .mount(&server)
        .await;

    let err = fetch(&google_against(&server, 2)).await.unwrap_err();

    assert!(format!("{err:#}").contains("Invalid API key"));
    server.verify().await;
}

async fn failing_server(route: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn chatgpt_server_error_falls_back_to_synthetic_answer() {
    let server = failing_server("/chat/completions").await;
    let provider = ChatGptCitations::with_client(OpenAi::new("test-key").with_base_url(server.uri()));

    let result = provider.check_citations("weather", "en").await.unwrap().unwrap();

    assert_eq!(result, synthetic_result(Assistant::ChatGpt, "weather", "en"));
    server.verify().await;
}

#[tokio::test]
async fn claude_server_error_falls_back_to_synthetic_answer() {
    let server = failing_server("/messages").await;
    let provider = ClaudeCitations::with_client(Claude::new("test-key").with_base_url(server.uri()));

    let result = provider.check_citations("天気", "ja").await.unwrap().unwrap();

    assert_eq!(result, synthetic_result(Assistant::Claude, "天気", "ja"));
    server.verify().await;
}

#[tokio::test]
async fn gemini_server_error_falls_back_to_synthetic_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let provider = GeminiCitations::with_client(Gemini::new("test-key").with_base_url(server.uri()));

    let result = provider.check_citations("weather", "en").await.unwrap().unwrap();

    assert_eq!(result, synthetic_result(Assistant::Gemini, "weather", "en"));
    server.verify().await;
}

#[tokio::test]
async fn chatgpt_answer_is_read_from_live_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Sunny today.",
                    "annotations": [
                        {"type": "url_citation", "url_citation": {"url": "https://weather.com/today"}},
                        {"type": "url_citation", "url_citation": {"url": "https://weather.com/today"}}
                    ]
                }
            }]
        })))
        .mount(&server)
        .await;
    let provider = ChatGptCitations::with_client(OpenAi::new("test-key").with_base_url(server.uri()));

    let result = provider.check_citations("weather", "en").await.unwrap().unwrap();

    assert_eq!(result.citations, vec!["https://weather.com/today"]);
    assert_eq!(result.excerpt, "Sunny today.");
    assert!(provider.check_target_domain_match(&result.citations, &["weather.com".to_string()]));
}
