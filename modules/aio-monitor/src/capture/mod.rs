//! Evidentiary screenshots of results pages.
//!
//! [`EvidenceCapture`] owns file naming, device profiles and the two capture
//! waves. The browser itself sits behind [`PageCapturer`]; the production
//! implementation is [`chrome::ChromeCapturer`].

pub mod chrome;

pub use chrome::ChromeCapturer;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use aio_common::{Device, Engine, ScreenshotData};

/// Element selector for the AI Overview panel on a Google results page.
pub const AIO_SELECTOR: &str = r#"[data-attrid="AIOverview"], [data-attrid="SGE"]"#;

pub const PAGE_SETTLE: Duration = Duration::from_secs(2);
pub const AIO_SETTLE: Duration = Duration::from_secs(3);
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_KEYWORD_CHARS: usize = 30;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

/// Viewport and user agent used for one device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub width: u32,
    pub height: u32,
    pub mobile: bool,
    pub user_agent: &'static str,
}

impl DeviceProfile {
    pub fn for_device(device: Device) -> Self {
        match device {
            Device::Desktop => Self {
                width: 1920,
                height: 1080,
                mobile: false,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            },
            Device::Mobile => Self {
                width: 375,
                height: 667,
                mobile: true,
                user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
            },
        }
    }
}

/// What [`PageCapturer::capture_element`] actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShot {
    Element,
    /// Selector matched nothing; the full page was captured instead.
    FullPage,
}

/// One navigation plus one screenshot in an isolated browsing context.
///
/// Implementations must release the context on every exit path.
#[async_trait]
pub trait PageCapturer: Send + Sync {
    async fn capture_page(
        &self,
        url: &str,
        profile: &DeviceProfile,
        settle: Duration,
        full_page: bool,
        path: &Path,
    ) -> Result<()>;

    /// Screenshot the first element matching `selector`, falling back to the
    /// full page when there is none.
    async fn capture_element(
        &self,
        url: &str,
        profile: &DeviceProfile,
        settle: Duration,
        selector: &str,
        path: &Path,
    ) -> Result<ElementShot>;

    /// Release the browser. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

pub struct EvidenceCapture {
    capturer: Arc<dyn PageCapturer>,
    screenshot_dir: PathBuf,
}

impl EvidenceCapture {
    pub fn new(capturer: Arc<dyn PageCapturer>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            capturer,
            screenshot_dir: screenshot_dir.into(),
        }
    }

    /// Screenshot `url` as seen from `device`. Returns the stored path.
    pub async fn capture_screenshot(
        &self,
        url: &str,
        keyword: &str,
        device: Device,
        full_page: bool,
    ) -> Result<String> {
        let path = self.prepare_path(keyword, device, false).await?;
        let profile = DeviceProfile::for_device(device);

        self.capturer
            .capture_page(url, &profile, PAGE_SETTLE, full_page, &path)
            .await?;

        let stored = path.to_string_lossy().into_owned();
        info!(keyword, %device, path = %stored, "Screenshot saved");
        Ok(stored)
    }

    /// Crop of the Google AI Overview panel, or the whole page when the panel
    /// is not rendered.
    pub async fn capture_google_ai_overview(
        &self,
        keyword: &str,
        device: Device,
        lang: &str,
    ) -> Result<String> {
        let url = search_url(Engine::Google, keyword, lang);
        let path = self.prepare_path(keyword, device, true).await?;
        let profile = DeviceProfile::for_device(device);

        let shot = self
            .capturer
            .capture_element(&url, &profile, AIO_SETTLE, AIO_SELECTOR, &path)
            .await?;

        let stored = path.to_string_lossy().into_owned();
        match shot {
            ElementShot::Element => {
                info!(keyword, %device, path = %stored, "AI Overview screenshot saved")
            }
            ElementShot::FullPage => {
                debug!(keyword, %device, "No AI Overview element, captured full page")
            }
        }
        Ok(stored)
    }

    /// Desktop and mobile results pages concurrently, then (Google only) both
    /// AIO crops concurrently. A failed AIO crop is logged and left unset.
    pub async fn capture_multi_device_screenshots(
        &self,
        keyword: &str,
        engine: Engine,
        lang: &str,
    ) -> Result<ScreenshotData> {
        let url = search_url(engine, keyword, lang);
        let mut data = ScreenshotData::new(Utc::now());

        let (desktop, mobile) = tokio::join!(
            self.capture_screenshot(&url, keyword, Device::Desktop, true),
            self.capture_screenshot(&url, keyword, Device::Mobile, true),
        );
        data.desktop_path = Some(desktop?);
        data.mobile_path = Some(mobile?);

        if engine == Engine::Google {
            let (aio_desktop, aio_mobile) = tokio::join!(
                self.capture_google_ai_overview(keyword, Device::Desktop, lang),
                self.capture_google_ai_overview(keyword, Device::Mobile, lang),
            );
            data.aio_desktop_path = optional_shot(keyword, Device::Desktop, aio_desktop);
            data.aio_mobile_path = optional_shot(keyword, Device::Mobile, aio_mobile);
        }

        Ok(data)
    }

    /// Results page for one device, then (Google only) its AIO crop.
    pub async fn capture_for_device(
        &self,
        keyword: &str,
        engine: Engine,
        device: Device,
        lang: &str,
    ) -> Result<ScreenshotData> {
        let url = search_url(engine, keyword, lang);
        let mut data = ScreenshotData::new(Utc::now());

        let page = self.capture_screenshot(&url, keyword, device, true).await?;
        let aio = if engine == Engine::Google {
            optional_shot(
                keyword,
                device,
                self.capture_google_ai_overview(keyword, device, lang).await,
            )
        } else {
            None
        };

        match device {
            Device::Desktop => {
                data.desktop_path = Some(page);
                data.aio_desktop_path = aio;
            }
            Device::Mobile => {
                data.mobile_path = Some(page);
                data.aio_mobile_path = aio;
            }
        }
        Ok(data)
    }

    pub async fn close(&self) -> Result<()> {
        self.capturer.close().await
    }

    async fn prepare_path(&self, keyword: &str, device: Device, aio: bool) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.screenshot_dir).await?;
        Ok(self
            .screenshot_dir
            .join(screenshot_filename(Utc::now(), keyword, device, aio)))
    }
}

fn optional_shot(keyword: &str, device: Device, shot: Result<String>) -> Option<String> {
    match shot {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(keyword, %device, error = %e, "AI Overview capture failed");
            None
        }
    }
}

/// `{date}_{time}_{keyword}_[aio_]{device}.png`. Non-alphanumeric keyword
/// characters become `_` and the keyword part is cut to 30 characters.
pub fn screenshot_filename(at: DateTime<Utc>, keyword: &str, device: Device, aio: bool) -> String {
    let sanitized: String = keyword
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_KEYWORD_CHARS)
        .collect();
    let tag = if aio { "aio_" } else { "" };
    format!(
        "{}_{}_{sanitized}_{tag}{device}.png",
        at.format("%Y-%m-%d"),
        at.format("%H-%M-%S")
    )
}

/// Public results-page URL for `keyword` on `engine`.
pub fn search_url(engine: Engine, keyword: &str, lang: &str) -> String {
    match engine {
        Engine::Google => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("q", keyword)
                .append_pair("hl", lang)
                .finish();
            format!("https://www.google.com/search?{query}")
        }
        Engine::Yahoo => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("p", keyword)
                .finish();
            format!("https://search.yahoo.co.jp/search?{query}")
        }
    }
}
