use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aio_common::Config;

use super::{CaptureError, DeviceProfile, ElementShot, PageCapturer, Result, NAVIGATION_TIMEOUT};

impl From<CdpError> for CaptureError {
    fn from(err: CdpError) -> Self {
        CaptureError::Browser(err.to_string())
    }
}

struct BrowserHandle {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

enum Shot<'a> {
    Page { full_page: bool },
    Element(&'a str),
}

/// Headless Chromium over the DevTools protocol.
///
/// The browser is launched (or, with a websocket URL, connected to) on first
/// use and shared by every capture until [`PageCapturer::close`]. Each capture
/// runs in its own browser context.
pub struct ChromeCapturer {
    ws_url: Option<String>,
    chrome_bin: Option<PathBuf>,
    handle: Mutex<Option<BrowserHandle>>,
}

impl ChromeCapturer {
    pub fn new(ws_url: Option<String>, chrome_bin: Option<PathBuf>) -> Self {
        Self {
            ws_url,
            chrome_bin,
            handle: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.browser_ws_url.clone(), config.chrome_bin.clone())
    }

    async fn browser(&self) -> Result<Arc<Browser>> {
        let mut guard = self.handle.lock().await;
        if let Some(ref handle) = *guard {
            return Ok(handle.browser.clone());
        }

        let handle = self.start().await?;
        let browser = handle.browser.clone();
        *guard = Some(handle);
        Ok(browser)
    }

    async fn start(&self) -> Result<BrowserHandle> {
        let (browser, mut handler) = match self.ws_url {
            Some(ref ws_url) => {
                info!("Connecting to remote browser");
                Browser::connect(ws_url.clone())
                    .await
                    .map_err(|e| CaptureError::Launch(e.to_string()))?
            }
            None => {
                let mut builder = BrowserConfig::builder()
                    .window_size(1920, 1080)
                    .args(["--no-sandbox", "--disable-setuid-sandbox", "--disable-dev-shm-usage"]);
                if let Some(ref bin) = self.chrome_bin {
                    builder = builder.chrome_executable(bin);
                }
                let config = builder.build().map_err(CaptureError::Launch)?;
                info!("Launching headless browser");
                Browser::launch(config)
                    .await
                    .map_err(|e| CaptureError::Launch(e.to_string()))?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                // Newer Chrome builds emit messages the protocol types don't
                // know about; those are not fatal.
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
            debug!("CDP handler finished");
        });

        Ok(BrowserHandle {
            browser: Arc::new(browser),
            handler,
        })
    }

    async fn session(
        &self,
        url: &str,
        profile: &DeviceProfile,
        settle: Duration,
        shot: Shot<'_>,
        path: &Path,
    ) -> Result<ElementShot> {
        let browser = self.browser().await?;
        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        let outcome = in_context(&browser, context_id.clone(), url, profile, settle, shot, path).await;

        if let Err(e) = browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            warn!(error = %e, "Failed to dispose browser context");
        }
        outcome
    }
}

async fn in_context(
    browser: &Browser,
    context_id: BrowserContextId,
    url: &str,
    profile: &DeviceProfile,
    settle: Duration,
    shot: Shot<'_>,
    path: &Path,
) -> Result<ElementShot> {
    let target = CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context_id)
        .build()
        .map_err(CaptureError::Browser)?;
    let page = browser.new_page(target).await?;

    let outcome = load_and_shoot(&page, url, profile, settle, shot, path).await;

    if let Err(e) = page.close().await {
        debug!(error = %e, "Page close failed");
    }
    outcome
}

async fn load_and_shoot(
    page: &Page,
    url: &str,
    profile: &DeviceProfile,
    settle: Duration,
    shot: Shot<'_>,
    path: &Path,
) -> Result<ElementShot> {
    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(profile.width),
        i64::from(profile.height),
        1.0,
        profile.mobile,
    ))
    .await?;
    page.execute(SetUserAgentOverrideParams::new(profile.user_agent))
        .await?;

    navigate(page, url).await?;
    tokio::time::sleep(settle).await;

    match shot {
        Shot::Page { full_page } => {
            save_page(page, full_page, path).await?;
            Ok(ElementShot::FullPage)
        }
        Shot::Element(selector) => match page.find_element(selector).await {
            Ok(element) => {
                element
                    .save_screenshot(CaptureScreenshotFormat::Png, path)
                    .await?;
                Ok(ElementShot::Element)
            }
            Err(_) => {
                save_page(page, true, path).await?;
                Ok(ElementShot::FullPage)
            }
        },
    }
}

/// Tracks lifecycle events for one navigation. Idle only counts once the
/// navigation's own `init` has been seen, so the blank start page can't end
/// the wait.
#[derive(Debug, Default)]
struct IdleWatch {
    armed: bool,
}

impl IdleWatch {
    fn observe(&mut self, name: &str) -> bool {
        match name {
            "init" => {
                self.armed = true;
                false
            }
            "networkIdle" => self.armed,
            _ => false,
        }
    }
}

/// Load `url`, then wait for the network to go idle, all within
/// [`NAVIGATION_TIMEOUT`].
async fn navigate(page: &Page, url: &str) -> Result<()> {
    let load = async {
        page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
        let mut events = page.event_listener::<EventLifecycleEvent>().await?;

        page.goto(url).await?.wait_for_navigation().await?;

        let mut watch = IdleWatch::default();
        while let Some(event) = events.next().await {
            if watch.observe(&event.name) {
                debug!(url, "Network idle");
                break;
            }
        }
        Ok::<(), CdpError>(())
    };

    match tokio::time::timeout(NAVIGATION_TIMEOUT, load).await {
        Ok(loaded) => loaded.map_err(CaptureError::from),
        Err(_) => Err(CaptureError::Timeout {
            url: url.to_string(),
            timeout: NAVIGATION_TIMEOUT,
        }),
    }
}

async fn save_page(page: &Page, full_page: bool, path: &Path) -> Result<()> {
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(full_page)
        .build();
    page.save_screenshot(params, path).await?;
    Ok(())
}

#[async_trait]
impl PageCapturer for ChromeCapturer {
    async fn capture_page(
        &self,
        url: &str,
        profile: &DeviceProfile,
        settle: Duration,
        full_page: bool,
        path: &Path,
    ) -> Result<()> {
        self.session(url, profile, settle, Shot::Page { full_page }, path)
            .await
            .map(|_| ())
    }

    async fn capture_element(
        &self,
        url: &str,
        profile: &DeviceProfile,
        settle: Duration,
        selector: &str,
        path: &Path,
    ) -> Result<ElementShot> {
        self.session(url, profile, settle, Shot::Element(selector), path)
            .await
    }

    async fn close(&self) -> Result<()> {
        let Some(handle) = self.handle.lock().await.take() else {
            return Ok(());
        };

        let closed = match Arc::try_unwrap(handle.browser) {
            Ok(mut browser) => browser.close().await.map(|_| ()).map_err(CaptureError::from),
            Err(_) => {
                warn!("Browser still referenced at close, dropping handle");
                Ok(())
            }
        };
        handle.handler.abort();
        info!("Browser closed");
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_without_launch_is_a_no_op() {
        let capturer = ChromeCapturer::new(None, None);
        capturer.close().await.unwrap();
        capturer.close().await.unwrap();
    }

    #[test]
    fn idle_waits_for_navigation_init() {
        let mut watch = IdleWatch::default();
        assert!(!watch.observe("networkIdle"));
        assert!(!watch.observe("init"));
        assert!(!watch.observe("load"));
        assert!(!watch.observe("networkAlmostIdle"));
        assert!(watch.observe("networkIdle"));
    }

    #[test]
    fn cdp_errors_become_browser_errors() {
        let err: CaptureError = CdpError::Timeout.into();
        assert!(matches!(err, CaptureError::Browser(_)));
    }
}
