pub mod chromium;
pub mod error;

pub use chromium::{ChromiumEngine, Endpoint};
pub use error::{BrowserError, Result};

use std::time::Duration;

use async_trait::async_trait;

/// Desktop Chrome user agent so target pages serve their normal layout.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A browser that hands out isolated sessions (one tab each).
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One live tab. Only one caller drives it at a time; `close` must be
/// called exactly once when the owner is done, on every exit path.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and wait for the page to settle, bounded by `timeout`.
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluate a script expression in the page. `undefined` maps to `Null`.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Scroll forward by a multiple of the viewport height.
    async fn scroll_by_viewports(&mut self, viewports: f64) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}
