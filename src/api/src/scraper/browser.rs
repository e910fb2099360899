//! Browser automation using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::EventLifecycleEvent;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::source::{PageRenderer, RenderRequest, RenderSession};
use crate::error::FetchError;

/// Poll interval while waiting for the ready selector
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Lifecycle event that starts a new document
const LIFECYCLE_INIT: &str = "init";

/// Lifecycle event fired once the page has had no network activity for 500ms
const LIFECYCLE_NETWORK_IDLE: &str = "networkIdle";

/// Consume lifecycle event names until the navigated document reports network idle.
///
/// Idle events seen before the document's `init` belong to the previous page.
async fn wait_for_network_idle<S>(mut events: S) -> Result<(), FetchError>
where
    S: Stream<Item = String> + Unpin,
{
    let mut started = false;
    while let Some(name) = events.next().await {
        match name.as_str() {
            LIFECYCLE_INIT => started = true,
            LIFECYCLE_NETWORK_IDLE if started => return Ok(()),
            _ => {}
        }
    }
    Err(FetchError::Browser(
        "page closed before network went idle".to_string(),
    ))
}

/// Run `probe` every `interval` until it reports a match.
///
/// A probe error ends the wait straight away.
async fn poll_until_present<F, Fut>(mut probe: F, interval: Duration) -> Result<(), FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, FetchError>>,
{
    while !probe().await? {
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

/// Launches headless Chrome sessions
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    executable: String,
}

impl ChromeRenderer {
    pub fn new(executable: Option<String>) -> Self {
        Self {
            executable: executable.unwrap_or_else(|| default_executable().to_string()),
        }
    }
}

/// Usual Chrome install location for the host OS
fn default_executable() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    } else if cfg!(target_os = "windows") {
        "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"
    } else {
        "google-chrome"
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, FetchError> {
        let browser = Browser::launch(&self.executable).await?;
        Ok(Box::new(browser))
    }
}

/// Browser wrapper for one scrape
pub struct Browser {
    browser: Option<ChromeBrowser>,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch a new headless browser instance
    pub async fn launch(executable: &str) -> Result<Self, FetchError> {
        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .disable_default_args()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .window_size(1920, 1080)
            .build()
            .map_err(|e| FetchError::BrowserLaunch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .map_err(|e| FetchError::BrowserLaunch(e.to_string()))?;

        // Spawn handler task - must keep running for browser to work
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            handle,
        })
    }

    /// Open a page in a fresh browser context
    async fn open_page(&mut self) -> Result<Page, FetchError> {
        let browser = self
            .browser
            .as_mut()
            .ok_or_else(|| FetchError::Browser("browser already closed".to_string()))?;

        let context_id = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| FetchError::Browser(format!("failed to create context: {}", e)))?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(FetchError::Browser)?;

        browser
            .new_page(target)
            .await
            .map_err(|e| FetchError::Browser(format!("failed to create new page: {}", e)))
    }

    /// Poll until an element matching `selector` exists
    async fn wait_for_selector(page: &Page, selector: &str) -> Result<(), FetchError> {
        poll_until_present(
            move || async move {
                // querySelectorAll: no match is an empty list, not an error
                page.find_elements(selector)
                    .await
                    .map(|found| !found.is_empty())
                    .map_err(|e| FetchError::Browser(format!("selector lookup failed: {}", e)))
            },
            SELECTOR_POLL,
        )
        .await
    }
}

#[async_trait]
impl RenderSession for Browser {
    async fn render(&mut self, request: &RenderRequest) -> Result<String, FetchError> {
        let page = self.open_page().await?;

        // Subscribe before navigating so the idle event cannot be missed
        let lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| FetchError::Browser(format!("failed to watch page lifecycle: {}", e)))?;

        let navigation = async {
            page.goto(request.url.as_str())
                .await
                .map_err(|e| FetchError::Browser(format!("navigation failed: {}", e)))?;
            wait_for_network_idle(lifecycle.map(|event| event.name.clone())).await
        };
        timeout(request.navigation_timeout, navigation)
            .await
            .map_err(|_| FetchError::NavigationTimeout {
                url: request.url.clone(),
                timeout: request.navigation_timeout,
            })??;

        timeout(
            request.selector_timeout,
            Self::wait_for_selector(&page, &request.ready_selector),
        )
        .await
        .map_err(|_| FetchError::ElementWaitTimeout {
            selector: request.ready_selector.clone(),
            timeout: request.selector_timeout,
        })??;

        let html = page
            .content()
            .await
            .map_err(|e| FetchError::Browser(format!("failed to get page content: {}", e)))?;

        // The whole browser goes away on close, so a failed page close is harmless
        let _ = page.close().await;

        Ok(html)
    }

    async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed waiting for browser exit: {}", e);
            }
        }
        self.handle.abort();
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        // Dropping the chromiumoxide browser kills the child process
        self.handle.abort();
    }
}
