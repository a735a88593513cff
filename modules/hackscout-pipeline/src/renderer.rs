use std::time::Duration;

use ai_client::truncate_chars;
use browser_client::BrowserSession;
use hackscout_common::{RawSignals, RenderError};
use serde::Deserialize;
use tracing::{debug, info};

/// Character cap on body text handed to the text-understanding service.
pub const BODY_TEXT_CAP: usize = 30_000;

pub const PAGE_TIMEOUT: Duration = Duration::from_secs(60);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after each scroll so lazy-loaded media can arrive.
pub const SCROLL_PAUSE: Duration = Duration::from_millis(1500);
const SCROLL_VIEWPORTS: f64 = 2.0;

/// Video-like elements, including X/Twitter's video wrapper.
pub const MEDIA_COUNT_SCRIPT: &str =
    r#"document.querySelectorAll('video, [data-testid="videoComponent"]').length"#;

// Body text is cut by code point so an astral character never leaves a lone
// surrogate behind. Only a bounded prefix is spread into an array: 2 * cap
// UTF-16 units always hold at least cap code points.
const PAGE_SIGNALS_TEMPLATE: &str = r#"(() => {
  const cap = __BODY_TEXT_CAP__;
  const text = document.body ? document.body.innerText : '';
  const meta = (key) =>
    document.querySelector(`meta[property="${key}"]`)?.content ||
    document.querySelector(`meta[name="${key}"]`)?.content ||
    '';
  return {
    title: meta('og:title') || document.title || '',
    url: window.location.href,
    body_text: Array.from(text.substring(0, cap * 2)).slice(0, cap).join(''),
    media_count: document.querySelectorAll('video, [data-testid="videoComponent"]').length,
  };
})()"#;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageSignals {
    title: Option<String>,
    url: Option<String>,
    body_text: Option<String>,
    media_count: Option<u32>,
}

/// Loads pages in a borrowed browser session and reads signals out of the DOM.
#[derive(Debug, Clone)]
pub struct Renderer {
    page_timeout: Duration,
    probe_timeout: Duration,
    scroll_pause: Duration,
    body_text_cap: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            page_timeout: PAGE_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
            scroll_pause: SCROLL_PAUSE,
            body_text_cap: BODY_TEXT_CAP,
        }
    }

    pub fn with_timeouts(mut self, page_timeout: Duration, probe_timeout: Duration) -> Self {
        self.page_timeout = page_timeout;
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn with_scroll_pause(mut self, pause: Duration) -> Self {
        self.scroll_pause = pause;
        self
    }

    pub fn with_body_text_cap(mut self, cap: usize) -> Self {
        self.body_text_cap = cap;
        self
    }

    pub fn body_text_cap(&self) -> usize {
        self.body_text_cap
    }

    fn page_signals_script(&self) -> String {
        PAGE_SIGNALS_TEMPLATE.replace("__BODY_TEXT_CAP__", &self.body_text_cap.to_string())
    }

    /// Load the primary page and read title, resolved URL, body text and media count.
    pub async fn render(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<RawSignals, RenderError> {
        session
            .load(url, self.page_timeout)
            .await
            .map_err(|e| RenderError::new(url, e))?;

        let value = session
            .evaluate(&self.page_signals_script())
            .await
            .map_err(|e| RenderError::new(url, e))?;

        let signals: PageSignals = serde_json::from_value(value)
            .map_err(|e| RenderError::new(url, format!("unexpected page signals: {e}")))?;

        let canonical_url = signals
            .url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| url.to_string());
        let body_text = signals.body_text.unwrap_or_default();

        let raw = RawSignals {
            title: signals.title.unwrap_or_default().trim().to_string(),
            canonical_url,
            body_text: truncate_chars(&body_text, self.body_text_cap).to_string(),
            media_element_count: signals.media_count.unwrap_or(0),
        };

        info!(
            url,
            canonical_url = raw.canonical_url.as_str(),
            title = raw.title.as_str(),
            body_chars = raw.body_text.chars().count(),
            media = raw.media_element_count,
            "Page rendered"
        );

        Ok(raw)
    }

    /// Load a search page and scroll until `target` media elements are
    /// present or `max_iterations` scrolls have happened. Returns the last
    /// measured count, uncapped.
    pub async fn count_media(
        &self,
        session: &mut dyn BrowserSession,
        search_url: &str,
        target: u32,
        max_iterations: u32,
    ) -> Result<u32, RenderError> {
        session
            .load(search_url, self.probe_timeout)
            .await
            .map_err(|e| RenderError::new(search_url, e))?;

        let mut count = 0;
        for scroll in 0..max_iterations {
            count = self.measure_media(session, search_url).await?;
            if count >= target {
                debug!(search_url, count, scroll, "Media target reached");
                break;
            }

            session
                .scroll_by_viewports(SCROLL_VIEWPORTS)
                .await
                .map_err(|e| RenderError::new(search_url, e))?;
            tokio::time::sleep(self.scroll_pause).await;
        }

        Ok(count)
    }

    async fn measure_media(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<u32, RenderError> {
        let value = session
            .evaluate(MEDIA_COUNT_SCRIPT)
            .await
            .map_err(|e| RenderError::new(url, e))?;

        value
            .as_u64()
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .ok_or_else(|| RenderError::new(url, format!("media count is not a number: {value}")))
    }
}
