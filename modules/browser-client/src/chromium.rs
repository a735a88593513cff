use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{BrowserError, Result};
use crate::{BrowserEngine, BrowserSession, DEFAULT_USER_AGENT};

/// Resource-timing poll interval while waiting for the network to go quiet.
const QUIET_POLL: Duration = Duration::from_millis(250);
/// How long the resource count must stay unchanged to count as quiet.
const QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Resource-timing entries are only buffered up to 250 by default, after
/// which the count stops growing and would read as quiet. The buffer is
/// raised on every poll so entries after the first poll keep counting.
const RESOURCE_COUNT_SCRIPT: &str = "(performance.setResourceTimingBufferSize(100000), performance.getEntriesByType('resource').length)";

/// Tracks how long the resource count has held still.
#[derive(Debug)]
struct QuietTracker {
    last: u64,
    stable: Duration,
}

impl QuietTracker {
    fn new(initial: u64) -> Self {
        Self {
            last: initial,
            stable: Duration::ZERO,
        }
    }

    /// Record a poll taken `elapsed` after the previous one. True once the
    /// count has been unchanged for QUIET_WINDOW.
    fn observe(&mut self, count: u64, elapsed: Duration) -> bool {
        if count == self.last {
            self.stable += elapsed;
        } else {
            self.stable = Duration::ZERO;
            self.last = count;
        }
        self.stable >= QUIET_WINDOW
    }
}

/// Where sessions come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Spawn a local headless Chromium per session.
    Launch { chrome_bin: Option<String> },
    /// Attach to a remote CDP websocket (e.g. a Browserless instance).
    Connect { url: String },
}

pub struct ChromiumEngine {
    endpoint: Endpoint,
    user_agent: String,
}

impl ChromiumEngine {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Remote CDP endpoint when `chrome_url` is set, local launch otherwise.
    pub fn from_settings(chrome_url: Option<&str>, chrome_bin: Option<&str>) -> Self {
        let endpoint = match chrome_url {
            Some(url) if !url.trim().is_empty() => Endpoint::Connect {
                url: url.trim().to_string(),
            },
            _ => Endpoint::Launch {
                chrome_bin: chrome_bin.map(String::from),
            },
        };
        Self::new(endpoint)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn start_browser(&self) -> Result<(Browser, JoinHandle<()>)> {
        let (browser, mut handler) = match &self.endpoint {
            Endpoint::Launch { chrome_bin } => {
                let mut builder = BrowserConfig::builder()
                    .no_sandbox()
                    .arg("--disable-setuid-sandbox")
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage");
                if let Some(bin) = chrome_bin {
                    builder = builder.chrome_executable(bin);
                }
                let config = builder.build().map_err(BrowserError::Launch)?;
                Browser::launch(config)
                    .await
                    .map_err(|e| BrowserError::Launch(e.to_string()))?
            }
            Endpoint::Connect { url } => {
                Browser::connect(url.clone())
                    .await
                    .map_err(|e| BrowserError::Connect {
                        url: url.clone(),
                        message: e.to_string(),
                    })?
            }
        };

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok((browser, handler_task))
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>> {
        let (mut browser, handler) = self.start_browser().await?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                shutdown_browser(&mut browser, handler).await;
                return Err(BrowserError::Launch(format!("Failed to open tab: {e}")));
            }
        };

        if let Err(e) = page.set_user_agent(self.user_agent.clone()).await {
            let _ = page.close().await;
            shutdown_browser(&mut browser, handler).await;
            return Err(BrowserError::Launch(format!("Failed to set user agent: {e}")));
        }

        info!(endpoint = ?self.endpoint, "Browser session opened");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler,
        }))
    }
}

async fn shutdown_browser(browser: &mut Browser, handler: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "Browser close failed");
    }
    let _ = browser.wait().await;
    handler.abort();
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Resolves once the resource-timing count stops growing for QUIET_WINDOW.
    async fn wait_for_network_quiet(&self) -> Result<()> {
        let mut tracker = QuietTracker::new(self.resource_count().await?);

        loop {
            tokio::time::sleep(QUIET_POLL).await;
            if tracker.observe(self.resource_count().await?, QUIET_POLL) {
                break;
            }
        }

        debug!(resources = tracker.last, "Network quiet");
        Ok(())
    }

    async fn resource_count(&self) -> Result<u64> {
        let result = self.page.evaluate(RESOURCE_COUNT_SCRIPT).await?;
        Ok(result.value().and_then(|v| v.as_u64()).unwrap_or(0))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let navigate = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.wait_for_network_quiet().await
        };

        match tokio::time::timeout(timeout, navigate).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn scroll_by_viewports(&mut self, viewports: f64) -> Result<()> {
        let script = format!("window.scrollBy(0, window.innerHeight * {viewports})");
        self.page.evaluate(script).await?;
        Ok(())
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        let page_result = self.page.clone().close().await;

        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();

        page_result.map_err(|e| BrowserError::Closed(e.to_string()))
    }
}

impl Drop for ChromiumSession {
    /// Sessions dropped without `close` still stop driving the CDP
    /// connection; the websocket goes away with the handler.
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_url_selects_remote_endpoint() {
        let engine = ChromiumEngine::from_settings(Some(" ws://browserless:3000 "), Some("/usr/bin/chromium"));
        assert_eq!(
            engine.endpoint(),
            &Endpoint::Connect {
                url: "ws://browserless:3000".to_string()
            }
        );
    }

    #[test]
    fn blank_chrome_url_falls_back_to_local_launch() {
        let engine = ChromiumEngine::from_settings(Some("  "), Some("/usr/bin/chromium"));
        assert_eq!(
            engine.endpoint(),
            &Endpoint::Launch {
                chrome_bin: Some("/usr/bin/chromium".to_string())
            }
        );
    }

    #[test]
    fn default_user_agent_is_a_desktop_browser() {
        let engine = ChromiumEngine::from_settings(None, None);
        assert_eq!(engine.user_agent, DEFAULT_USER_AGENT);
        assert!(!engine.user_agent.contains("Headless"));

        let engine = engine.with_user_agent("custom/1.0");
        assert_eq!(engine.user_agent, "custom/1.0");
    }

    #[test]
    fn quiet_after_count_holds_for_the_window() {
        let mut tracker = QuietTracker::new(10);
        assert!(!tracker.observe(10, QUIET_POLL));
        assert!(tracker.observe(10, QUIET_POLL));
    }

    #[test]
    fn new_resources_restart_the_quiet_window() {
        let mut tracker = QuietTracker::new(10);
        assert!(!tracker.observe(10, QUIET_POLL));
        assert!(!tracker.observe(14, QUIET_POLL));
        assert!(!tracker.observe(14, QUIET_POLL));
        assert!(tracker.observe(14, QUIET_POLL));
        assert_eq!(tracker.last, 14);
    }

    #[test]
    fn resource_count_lifts_the_timing_buffer_cap() {
        assert!(RESOURCE_COUNT_SCRIPT.contains("setResourceTimingBufferSize"));
    }
}
