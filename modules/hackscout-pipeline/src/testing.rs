// Test mocks for the enrichment pipeline.
//
// Two mocks matching the two capability boundaries:
// - MockBrowser / MockSession (BrowserEngine / BrowserSession): URL to scripted page
// - MockGenerator (TextGenerator): canned model text or a canned failure
//
// No browser, no network. Every session records what it was asked to do in a
// shared SessionLog so tests can assert on loads, scrolls and closes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use browser_client::{BrowserEngine, BrowserError, BrowserSession};
use serde_json::{json, Value};

use ai_client::TextGenerator;

use crate::renderer::MEDIA_COUNT_SCRIPT;

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

/// Scripted behaviour for one URL.
#[derive(Debug, Clone, Default)]
struct MockPage {
    signals: Option<Value>,
    /// Media count per scroll position; the last value repeats.
    media_counts: Vec<u32>,
    load_error: Option<String>,
    evaluate_error: Option<String>,
}

/// Everything the sessions of one MockBrowser did.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub opened: usize,
    pub closed: usize,
    pub loads: Vec<String>,
    pub load_timeouts: Vec<Duration>,
    pub scrolls: usize,
}

/// HashMap-based browser. Loading an unregistered URL fails with a
/// navigation error. Builder pattern: `.on_page()`, `.on_media()`,
/// `.failing_load()`.
pub struct MockBrowser {
    pages: HashMap<String, MockPage>,
    open_error: Option<String>,
    log: Arc<Mutex<SessionLog>>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            open_error: None,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    /// A page whose DOM reports `title` and `body_text` and no redirect.
    pub fn on_page(self, url: &str, title: &str, body_text: &str) -> Self {
        self.on_page_signals(
            url,
            json!({
                "title": title,
                "url": url,
                "body_text": body_text,
                "media_count": 0,
            }),
        )
    }

    /// A page whose signals script returns exactly `signals`.
    pub fn on_page_signals(mut self, url: &str, signals: Value) -> Self {
        self.pages.entry(url.to_string()).or_default().signals = Some(signals);
        self
    }

    pub fn on_media(mut self, url: &str, counts: &[u32]) -> Self {
        self.pages.entry(url.to_string()).or_default().media_counts = counts.to_vec();
        self
    }

    pub fn failing_load(mut self, url: &str, message: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().load_error = Some(message.to_string());
        self
    }

    pub fn failing_evaluate(mut self, url: &str, message: &str) -> Self {
        self.pages.entry(url.to_string()).or_default().evaluate_error = Some(message.to_string());
        self
    }

    pub fn failing_open(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        self.log.clone()
    }
}

#[async_trait]
impl BrowserEngine for MockBrowser {
    async fn open_session(&self) -> browser_client::Result<Box<dyn BrowserSession>> {
        if let Some(ref message) = self.open_error {
            return Err(BrowserError::Launch(message.clone()));
        }
        self.log.lock().unwrap().opened += 1;
        Ok(Box::new(MockSession {
            pages: self.pages.clone(),
            current: None,
            scrolls_here: 0,
            log: self.log.clone(),
        }))
    }
}

pub struct MockSession {
    pages: HashMap<String, MockPage>,
    current: Option<String>,
    scrolls_here: usize,
    log: Arc<Mutex<SessionLog>>,
}

impl MockSession {
    fn current_page(&self) -> browser_client::Result<(&str, &MockPage)> {
        let url = self
            .current
            .as_deref()
            .ok_or_else(|| BrowserError::Evaluation("MockSession: nothing loaded".to_string()))?;
        let page = self
            .pages
            .get(url)
            .ok_or_else(|| BrowserError::Evaluation(format!("MockSession: no page for {url}")))?;
        Ok((url, page))
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn load(&mut self, url: &str, timeout: Duration) -> browser_client::Result<()> {
        {
            let mut log = self.log.lock().unwrap();
            log.loads.push(url.to_string());
            log.load_timeouts.push(timeout);
        }

        let page = self.pages.get(url).ok_or_else(|| BrowserError::Navigation {
            url: url.to_string(),
            message: "MockBrowser: no page registered".to_string(),
        })?;
        if let Some(ref message) = page.load_error {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: message.clone(),
            });
        }

        self.current = Some(url.to_string());
        self.scrolls_here = 0;
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> browser_client::Result<Value> {
        let (url, page) = self.current_page()?;
        if let Some(ref message) = page.evaluate_error {
            return Err(BrowserError::Evaluation(message.clone()));
        }

        if script == MEDIA_COUNT_SCRIPT {
            let count = match page.media_counts.len() {
                0 => 0,
                n => page.media_counts[self.scrolls_here.min(n - 1)],
            };
            return Ok(json!(count));
        }

        Ok(page.signals.clone().unwrap_or_else(|| {
            json!({ "title": "", "url": url, "body_text": "", "media_count": 0 })
        }))
    }

    async fn scroll_by_viewports(&mut self, _viewports: f64) -> browser_client::Result<()> {
        self.current_page()?;
        self.scrolls_here += 1;
        self.log.lock().unwrap().scrolls += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> browser_client::Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

enum Reply {
    Text(String),
    Failure(String),
    /// Never answers, like a stalled provider connection.
    Hang,
}

/// Returns the same canned reply (or failure) for every prompt and records
/// the prompts it was sent.
pub struct MockGenerator {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_reply(Reply::Text(text.to_string()))
    }

    pub fn replying_json(value: Value) -> Self {
        Self::replying(&value.to_string())
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Failure(message.to_string()))
    }

    pub fn hanging() -> Self {
        Self::with_reply(Reply::Hang)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Reply::Text(ref text) => Ok(text.clone()),
            Reply::Failure(ref message) => Err(anyhow!("MockGenerator: {message}")),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
