use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aio_common::{CaptureMode, Config, JobStatus};
use aio_monitor::capture::{ChromeCapturer, EvidenceCapture};
use aio_monitor::citations::{
    ChatGptCitations, CitationProvider, ClaudeCitations, GeminiCitations,
};
use aio_monitor::extract::detect_changes;
use aio_monitor::orchestrator::RunOrchestrator;
use aio_monitor::retry::RetryPolicy;
use aio_monitor::run_store::{self, RunStore};
use aio_monitor::search::{GoogleSearch, YahooSearch};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aio_monitor=info".parse()?))
        .init();

    info!("AIO monitor starting...");

    let config = Config::from_env()?;
    config.validate()?;
    config.log_redacted();

    let retry = RetryPolicy::new(
        config.max_retry_attempts,
        Duration::from_millis(config.retry_delay_ms),
    );

    let assistants: Vec<Arc<dyn CitationProvider>> = vec![
        Arc::new(ChatGptCitations::new(config.openai_api_key.clone())),
        Arc::new(ClaudeCitations::new(config.anthropic_api_key.clone())),
        Arc::new(GeminiCitations::new(config.google_ai_api_key.clone())),
    ];

    // The browser is only launched on first capture.
    let capture = (config.capture_mode != CaptureMode::Off).then(|| {
        Arc::new(EvidenceCapture::new(
            Arc::new(ChromeCapturer::from_config(&config)),
            config.screenshot_dir.clone(),
        ))
    });

    let orchestrator = RunOrchestrator::builder()
        .google(Arc::new(GoogleSearch::new(&config.serpapi_api_key, retry)?))
        .yahoo(Arc::new(YahooSearch::new(config.yahoo_api_key.clone(), retry)))
        .assistants(assistants)
        .capture(capture)
        .capture_mode(config.capture_mode)
        .default_targets(config.target_domains.clone())
        .build();

    let keywords = match config.keywords_file {
        Some(ref path) => run_store::load_keywords(path)?,
        None => {
            info!("KEYWORDS_FILE not set, using sample keywords");
            run_store::sample_keywords()
        }
    };

    let store = RunStore::new(config.output_dir.clone());
    let previous = store.latest().unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "Could not load previous run, skipping change detection");
        None
    });

    let results = orchestrator.run(&keywords).await;

    if let Some(ref previous) = previous {
        for result in &results {
            let prior = previous.iter().find(|p| {
                p.keyword == result.keyword && p.engine == result.engine && p.device == result.device
            });
            if prior.is_some() {
                detect_changes(result, prior);
            }
        }
    }

    if let Err(e) = store.save(&results) {
        error!(error = %format!("{e:#}"), "Failed to save run results");
    }

    let failed = results
        .iter()
        .filter(|r| r.job_status == JobStatus::Fail)
        .count();
    let partial = results
        .iter()
        .filter(|r| r.job_status == JobStatus::Partial)
        .count();
    info!(
        keywords = keywords.len(),
        results = results.len(),
        failed,
        partial,
        "AIO monitor finished"
    );

    Ok(())
}
