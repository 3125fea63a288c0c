//! Per-keyword run loop.
//!
//! For each keyword and engine: fetch the SERP (providers retry internally),
//! extract AIO and rank facts, ask enabled assistants (Google only), then
//! optionally capture evidence. A SERP failure yields a `fail` record, a
//! capture failure downgrades to `partial`; neither stops the run.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

use aio_common::{
    CaptureMode, DailyResult, Engine, JobStatus, KeywordConfig, LlmCitation, ScreenshotData,
};

use crate::capture::{self, EvidenceCapture};
use crate::citations::CitationProvider;
use crate::extract::{extract_aio_info, find_own_rank};
use crate::search::SearchProvider;

#[derive(Clone, TypedBuilder)]
pub struct RunOrchestrator {
    google: Arc<dyn SearchProvider>,
    yahoo: Arc<dyn SearchProvider>,
    #[builder(default)]
    assistants: Vec<Arc<dyn CitationProvider>>,
    #[builder(default)]
    capture: Option<Arc<EvidenceCapture>>,
    #[builder(default)]
    capture_mode: CaptureMode,
    /// Used for keywords that carry no target domains of their own.
    #[builder(default)]
    default_targets: Vec<String>,
}

impl RunOrchestrator {
    /// Process every keyword in order, Google before Yahoo. Always returns
    /// two records per keyword.
    pub async fn run(&self, configs: &[KeywordConfig]) -> Vec<DailyResult> {
        let mut results = Vec::with_capacity(configs.len() * 2);

        for (i, config) in configs.iter().enumerate() {
            info!(
                keyword = %config.keyword,
                lang = %config.lang,
                location = %config.location,
                device = %config.device,
                "Processing keyword {}/{}",
                i + 1,
                configs.len()
            );

            for provider in [&self.google, &self.yahoo] {
                let result = self.process_keyword(config, provider.as_ref()).await;
                log_summary(&result);
                results.push(result);
            }
        }

        if let Some(ref capture) = self.capture {
            if let Err(e) = capture.close().await {
                warn!(error = %e, "Failed to close browser");
            }
        }

        results
    }

    /// One (keyword, engine) pass.
    pub async fn process_keyword(
        &self,
        config: &KeywordConfig,
        provider: &dyn SearchProvider,
    ) -> DailyResult {
        let engine = provider.engine();
        let run_at = Utc::now();
        let targets = self.targets_for(config);

        let serp = match provider
            .get_top100(&config.keyword, &config.lang, &config.location, config.device)
            .await
        {
            Ok(serp) => serp,
            Err(e) => {
                error!(keyword = %config.keyword, %engine, error = %format!("{e:#}"), "SERP fetch failed");
                return DailyResult::failed(config, engine, run_at, format!("{e:#}"));
            }
        };

        let aio = extract_aio_info(&serp, targets);
        let rank = find_own_rank(&serp, targets);
        let mut result = DailyResult::from_serp(config, engine, run_at, aio, rank, serp.organic);

        if engine == Engine::Google {
            result.llm_results = self.check_assistants(config, targets).await;
        }

        if let Some(ref capture) = self.capture {
            match self.capture_evidence(capture, config, engine).await {
                Ok(Some(data)) => {
                    result.screenshot_path = data.page_path(config.device).map(str::to_string);
                    result.screenshot_data = Some(data);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(keyword = %config.keyword, %engine, error = %e, "Screenshot capture failed");
                    result.job_status = JobStatus::Partial;
                    result.error_message = Some(format!("Screenshot capture failed: {e}"));
                }
            }
        }

        result
    }

    fn targets_for<'a>(&'a self, config: &'a KeywordConfig) -> &'a [String] {
        if config.target_domains.is_empty() {
            &self.default_targets
        } else {
            &config.target_domains
        }
    }

    async fn check_assistants(&self, config: &KeywordConfig, targets: &[String]) -> Vec<LlmCitation> {
        let mut contributions = Vec::new();

        for provider in self.assistants.iter().filter(|p| p.is_enabled()) {
            let assistant = provider.assistant();
            match provider.check_citations(&config.keyword, &config.lang).await {
                Ok(Some(answer)) => {
                    let own_cited = provider.check_target_domain_match(&answer.citations, targets);
                    info!(
                        keyword = %config.keyword,
                        %assistant,
                        citations = answer.citations.len(),
                        own_cited,
                        "Assistant citations checked"
                    );
                    contributions.push(LlmCitation {
                        llm_engine: assistant,
                        llm_answer_present: answer.answer_present,
                        llm_citations: answer.citations,
                        llm_own_cited: own_cited,
                        llm_excerpt: answer.excerpt,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        keyword = %config.keyword,
                        %assistant,
                        error = %format!("{e:#}"),
                        "Citation check failed, skipping assistant"
                    );
                }
            }
        }

        contributions
    }

    async fn capture_evidence(
        &self,
        capture: &EvidenceCapture,
        config: &KeywordConfig,
        engine: Engine,
    ) -> capture::Result<Option<ScreenshotData>> {
        let data = match self.capture_mode {
            CaptureMode::Off => return Ok(None),
            CaptureMode::Configured => {
                capture
                    .capture_for_device(&config.keyword, engine, config.device, &config.lang)
                    .await?
            }
            CaptureMode::All => {
                capture
                    .capture_multi_device_screenshots(&config.keyword, engine, &config.lang)
                    .await?
            }
        };
        Ok(Some(data))
    }
}

fn log_summary(result: &DailyResult) {
    info!(
        keyword = %result.keyword,
        engine = %result.engine,
        status = %result.job_status,
        aio_present = result.aio_present,
        own_cited = result.own_cited,
        rank = ?result.serp_rank,
        assistants = result.llm_results.len(),
        screenshot = result.screenshot_path.as_deref().unwrap_or("-"),
        "Keyword summary"
    );
}

#[cfg(test)]
mod tests {
    use aio_common::Assistant;

    use super::*;
    use crate::testing::{serp_with_aio, serp_without_aio, MockCapturer, MockCitationProvider, MockSearchProvider};

    fn config(targets: &[&str]) -> KeywordConfig {
        KeywordConfig::new("weather today", targets.iter().map(|t| t.to_string()).collect())
    }

    fn providers() -> (Arc<MockSearchProvider>, Arc<MockSearchProvider>) {
        let google = MockSearchProvider::new(Engine::Google).on_keyword(
            "weather today",
            serp_with_aio(
                Engine::Google,
                &["https://weather.com/today"],
                &["https://wikipedia.org/", "https://weather.com/forecast"],
            ),
        );
        let yahoo = MockSearchProvider::new(Engine::Yahoo).on_keyword(
            "weather today",
            serp_without_aio(Engine::Yahoo, &["https://weather.com/"]),
        );
        (Arc::new(google), Arc::new(yahoo))
    }

    #[tokio::test]
    async fn default_targets_apply_when_keyword_has_none() {
        let (google, yahoo) = providers();
        let orchestrator = RunOrchestrator::builder()
            .google(google.clone())
            .yahoo(yahoo)
            .default_targets(vec!["weather.com".to_string()])
            .build();

        let result = orchestrator.process_keyword(&config(&[]), google.as_ref()).await;
        assert!(result.own_cited);
        assert_eq!(result.serp_rank, Some(2));
    }

    #[tokio::test]
    async fn assistants_only_run_for_google() {
        let (google, yahoo) = providers();
        let chatgpt = Arc::new(MockCitationProvider::answering(
            Assistant::ChatGpt,
            &["https://weather.com/a"],
            "Sunny",
        ));
        let orchestrator = RunOrchestrator::builder()
            .google(google)
            .yahoo(yahoo)
            .assistants(vec![chatgpt.clone() as Arc<dyn CitationProvider>])
            .build();

        let results = orchestrator.run(&[config(&["weather.com"])]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].engine, Engine::Google);
        assert_eq!(results[0].llm_results.len(), 1);
        assert!(results[0].llm_results[0].llm_own_cited);
        assert!(results[1].llm_results.is_empty());
        assert_eq!(chatgpt.calls(), 1);
    }

    #[tokio::test]
    async fn disabled_assistant_is_not_called() {
        let (google, yahoo) = providers();
        let gemini = Arc::new(MockCitationProvider::disabled(Assistant::Gemini));
        let orchestrator = RunOrchestrator::builder()
            .google(google.clone())
            .yahoo(yahoo)
            .assistants(vec![gemini.clone() as Arc<dyn CitationProvider>])
            .build();

        let result = orchestrator
            .process_keyword(&config(&["weather.com"]), google.as_ref())
            .await;
        assert!(result.llm_results.is_empty());
        assert_eq!(gemini.calls(), 0);
    }

    #[tokio::test]
    async fn capture_off_skips_browser() {
        let (google, yahoo) = providers();
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCapturer::new());
        let orchestrator = RunOrchestrator::builder()
            .google(google.clone())
            .yahoo(yahoo)
            .capture(Some(Arc::new(EvidenceCapture::new(mock.clone(), dir.path()))))
            .capture_mode(CaptureMode::Off)
            .build();

        let result = orchestrator
            .process_keyword(&config(&["weather.com"]), google.as_ref())
            .await;
        assert_eq!(result.job_status, JobStatus::Ok);
        assert!(result.screenshot_data.is_none());
        assert_eq!(mock.page_calls(), 0);
    }

    #[tokio::test]
    async fn capture_all_sets_primary_path_for_configured_device() {
        let (google, yahoo) = providers();
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCapturer::new());
        let orchestrator = RunOrchestrator::builder()
            .google(google.clone())
            .yahoo(yahoo)
            .capture(Some(Arc::new(EvidenceCapture::new(mock.clone(), dir.path()))))
            .capture_mode(CaptureMode::All)
            .build();

        let result = orchestrator
            .process_keyword(&config(&["weather.com"]), google.as_ref())
            .await;
        let data = result.screenshot_data.unwrap();
        assert_eq!(result.screenshot_path, data.desktop_path);
        assert!(data.mobile_path.is_some());
        assert_eq!(mock.page_calls(), 2);
    }

    #[tokio::test]
    async fn run_closes_browser_once() {
        let (google, yahoo) = providers();
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockCapturer::new());
        let orchestrator = RunOrchestrator::builder()
            .google(google)
            .yahoo(yahoo)
            .capture(Some(Arc::new(EvidenceCapture::new(mock.clone(), dir.path()))))
            .build();

        orchestrator
            .run(&[config(&["weather.com"]), config(&["weather.com"])])
            .await;
        assert_eq!(mock.close_calls(), 1);
    }
}
