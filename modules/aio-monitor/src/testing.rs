// Test mocks for the monitor.
//
// One mock per trait boundary:
// - MockSearchProvider (SearchProvider): HashMap-based keyword→SearchResult
// - MockCitationProvider (CitationProvider): fixed answer, error, or disabled
// - MockCapturer (PageCapturer): records calls, optional failures
//
// Plus builders for SearchResult fixtures.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use aio_common::{
    normalize, AiOverview, AioSource, Assistant, CitationResult, Device, Engine, Location,
    SearchResult, SerpItem,
};

use crate::capture::{self, DeviceProfile, ElementShot, PageCapturer};
use crate::citations::CitationProvider;
use crate::retry::RetryPolicy;
use crate::search::SearchProvider;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Results page with an AI Overview citing `aio_urls` and organic results
/// ranked 1.. in the order of `organic_urls`.
pub fn serp_with_aio(engine: Engine, aio_urls: &[&str], organic_urls: &[&str]) -> SearchResult {
    SearchResult {
        engine,
        aio: Some(AiOverview {
            present: true,
            sources: aio_urls
                .iter()
                .map(|url| AioSource {
                    url: url.to_string(),
                    domain: normalize(url),
                })
                .collect(),
            text_length: Some(240),
            has_followup: false,
        }),
        organic: organic(organic_urls),
    }
}

/// Results page without an AI Overview.
pub fn serp_without_aio(engine: Engine, organic_urls: &[&str]) -> SearchResult {
    SearchResult {
        engine,
        aio: None,
        organic: organic(organic_urls),
    }
}

fn organic(urls: &[&str]) -> Vec<SerpItem> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| SerpItem {
            rank: i as u32 + 1,
            domain: normalize(url),
            url: url.to_string(),
            title: None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// MockSearchProvider
// ---------------------------------------------------------------------------

/// Keyword-keyed search provider. Unregistered keywords fail.
/// With `.with_retry()` every lookup goes through the given policy, so
/// `attempts()` counts retries too.
pub struct MockSearchProvider {
    engine: Engine,
    results: HashMap<String, SearchResult>,
    retry: Option<RetryPolicy>,
    attempts: AtomicU32,
}

impl MockSearchProvider {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            results: HashMap::new(),
            retry: None,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn on_keyword(mut self, keyword: &str, result: SearchResult) -> Self {
        self.results.insert(keyword.to_string(), result);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn lookup(&self, keyword: &str) -> Result<SearchResult> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.results
            .get(keyword)
            .cloned()
            .ok_or_else(|| anyhow!("MockSearchProvider: 503 Service Unavailable for {keyword}"))
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn get_top100(
        &self,
        keyword: &str,
        _lang: &str,
        _location: &Location,
        _device: Device,
    ) -> Result<SearchResult> {
        match self.retry {
            Some(ref retry) => {
                retry
                    .run(&format!("{} SERP for \"{keyword}\"", self.engine), move || async move {
                        self.lookup(keyword)
                    })
                    .await
            }
            None => self.lookup(keyword),
        }
    }
}

// ---------------------------------------------------------------------------
// MockCitationProvider
// ---------------------------------------------------------------------------

enum CitationBehavior {
    Answer(Vec<String>, String),
    Fail,
    Disabled,
}

pub struct MockCitationProvider {
    assistant: Assistant,
    behavior: CitationBehavior,
    calls: AtomicU32,
}

impl MockCitationProvider {
    pub fn answering(assistant: Assistant, citations: &[&str], excerpt: &str) -> Self {
        Self::with_behavior(
            assistant,
            CitationBehavior::Answer(
                citations.iter().map(|c| c.to_string()).collect(),
                excerpt.to_string(),
            ),
        )
    }

    pub fn failing(assistant: Assistant) -> Self {
        Self::with_behavior(assistant, CitationBehavior::Fail)
    }

    pub fn disabled(assistant: Assistant) -> Self {
        Self::with_behavior(assistant, CitationBehavior::Disabled)
    }

    fn with_behavior(assistant: Assistant, behavior: CitationBehavior) -> Self {
        Self {
            assistant,
            behavior,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CitationProvider for MockCitationProvider {
    fn assistant(&self) -> Assistant {
        self.assistant
    }

    fn is_enabled(&self) -> bool {
        !matches!(self.behavior, CitationBehavior::Disabled)
    }

    async fn check_citations(&self, _keyword: &str, _lang: &str) -> Result<Option<CitationResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            CitationBehavior::Answer(ref citations, ref excerpt) => Ok(Some(CitationResult {
                assistant: self.assistant,
                citations: citations.clone(),
                excerpt: excerpt.clone(),
                answer_present: true,
            })),
            CitationBehavior::Fail => Err(anyhow!("MockCitationProvider: {} unavailable", self.assistant)),
            CitationBehavior::Disabled => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// MockCapturer
// ---------------------------------------------------------------------------

/// Browser stand-in. Writes nothing; records every call.
#[derive(Default)]
pub struct MockCapturer {
    fail_pages: bool,
    fail_elements: bool,
    element_missing: bool,
    page_calls: AtomicU32,
    element_calls: AtomicU32,
    close_calls: AtomicU32,
    urls: Mutex<Vec<String>>,
    profiles: Mutex<Vec<DeviceProfile>>,
}

impl MockCapturer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_pages(mut self) -> Self {
        self.fail_pages = true;
        self
    }

    pub fn failing_elements(mut self) -> Self {
        self.fail_elements = true;
        self
    }

    pub fn without_aio_element(mut self) -> Self {
        self.element_missing = true;
        self
    }

    pub fn page_calls(&self) -> u32 {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn element_calls(&self) -> u32 {
        self.element_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn profiles(&self) -> Vec<DeviceProfile> {
        self.profiles.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn record(&self, url: &str, profile: &DeviceProfile) {
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.push(*profile);
        }
    }
}

#[async_trait]
impl PageCapturer for MockCapturer {
    async fn capture_page(
        &self,
        url: &str,
        profile: &DeviceProfile,
        _settle: Duration,
        _full_page: bool,
        _path: &Path,
    ) -> capture::Result<()> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.record(url, profile);
        if self.fail_pages {
            return Err(capture::CaptureError::Browser(
                "MockCapturer: navigation failed".to_string(),
            ));
        }
        Ok(())
    }

    async fn capture_element(
        &self,
        url: &str,
        profile: &DeviceProfile,
        _settle: Duration,
        _selector: &str,
        _path: &Path,
    ) -> capture::Result<ElementShot> {
        self.element_calls.fetch_add(1, Ordering::SeqCst);
        self.record(url, profile);
        if self.fail_elements {
            return Err(capture::CaptureError::Timeout {
                url: url.to_string(),
                timeout: capture::NAVIGATION_TIMEOUT,
            });
        }
        Ok(if self.element_missing {
            ElementShot::FullPage
        } else {
            ElementShot::Element
        })
    }

    async fn close(&self) -> capture::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
