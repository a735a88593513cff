use std::fmt;
use std::sync::Arc;

use ai_client::{Claude, Gemini, TextGenerator};
use browser_client::{BrowserEngine, BrowserSession, ChromiumEngine};
use hackscout_common::{
    format_hashtag_counts, AppConfig, FinalRecord, LlmProvider, PipelineError,
};
use tracing::{info, info_span, warn, Instrument};

use crate::extractor::{ExtractionProfile, Extractor};
use crate::probe::Probe;
use crate::reconciler::reconcile;
use crate::renderer::Renderer;

/// Where a run currently is. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Idle,
    Rendering,
    Extracting,
    Reconciling,
    Probing,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Reconciling => "reconciling",
            PipelineStage::Probing => "probing",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Render, extract, reconcile, probe. One browser session per run, opened
/// here and lent to the renderer and probe; it is closed on every exit path.
pub struct Pipeline {
    engine: Arc<dyn BrowserEngine>,
    renderer: Renderer,
    extractor: Extractor,
    probe: Probe,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        generator: Arc<dyn TextGenerator>,
        profile: ExtractionProfile,
    ) -> Self {
        Self {
            engine,
            renderer: Renderer::new(),
            extractor: Extractor::new(generator, profile),
            probe: Probe::new(),
        }
    }

    /// Wire the production backends: Chromium over CDP and the configured LLM.
    pub fn from_config(config: &AppConfig) -> Self {
        let engine = ChromiumEngine::from_settings(
            config.chrome_url.as_deref(),
            config.chrome_bin.as_deref(),
        );
        let generator: Arc<dyn TextGenerator> = match config.llm_provider {
            LlmProvider::Gemini => Arc::new(Gemini::new(&config.llm_api_key, &config.llm_model)),
            LlmProvider::Claude => Arc::new(Claude::new(&config.llm_api_key, &config.llm_model)),
        };

        Self::new(
            Arc::new(engine),
            generator,
            ExtractionProfile::preset(config.extraction_preset),
        )
        .with_renderer(Renderer::new().with_timeouts(config.page_timeout, config.probe_timeout))
    }

    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    pub async fn run(&self, url: &str) -> Result<FinalRecord, PipelineError> {
        self.run_with_tags(url, &[]).await
    }

    /// Full run. `extra_tags` are probed alongside whatever the extractor
    /// finds. Only a failure to open the session or render the primary page
    /// fails the run.
    pub async fn run_with_tags(
        &self,
        url: &str,
        extra_tags: &[String],
    ) -> Result<FinalRecord, PipelineError> {
        self.run_in_session(url, extra_tags)
            .instrument(info_span!("pipeline", url))
            .await
    }

    async fn run_in_session(
        &self,
        url: &str,
        extra_tags: &[String],
    ) -> Result<FinalRecord, PipelineError> {
        let session = self
            .engine
            .open_session()
            .await
            .map_err(|e| PipelineError::Session(e.to_string()))?;
        let mut guard = SessionGuard::new(session);

        let result = match guard.session() {
            Some(session) => self.drive(session, url, extra_tags).await,
            None => Err(PipelineError::Session("browser session already closed".to_string())),
        };

        guard.close().await;
        result
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        extra_tags: &[String],
    ) -> Result<FinalRecord, PipelineError> {
        let mut stage = PipelineStage::Idle;
        let mut advance = |next: PipelineStage| {
            info!(from = %stage, to = %next, "Pipeline stage");
            stage = next;
        };

        advance(PipelineStage::Rendering);
        let raw = self.renderer.render(session, url).await?;

        advance(PipelineStage::Extracting);
        let candidate = match self.extractor.extract(&raw.body_text).await {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                warn!(error = %e, "Extraction failed, continuing with rendered signals");
                None
            }
        };

        advance(PipelineStage::Reconciling);
        let mut record = reconcile(&raw, candidate.as_ref());

        let found = candidate.map(|c| c.social_tags).unwrap_or_default();
        let tags = merge_tags(found, extra_tags);
        if !tags.is_empty() {
            advance(PipelineStage::Probing);
            let counts = self.probe.probe(&self.renderer, session, &tags).await;
            record.hashtag_counts = format_hashtag_counts(&counts);
        }

        advance(PipelineStage::Done);
        info!(
            title = record.title.as_str(),
            media = raw.media_element_count,
            tags = tags.len(),
            "Pipeline complete"
        );

        Ok(record)
    }
}

/// Owns a run's session. A run that finishes closes it through `close`; a
/// run whose future is dropped mid-flight closes it from `Drop` on a
/// spawned task, so the session is released on cancellation too.
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> Option<&mut (dyn BrowserSession + 'static)> {
        self.session.as_deref_mut()
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            close_session(session).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        warn!("Pipeline run cancelled, closing browser session");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(close_session(session));
            }
            Err(_) => warn!("No runtime to close browser session on, dropping it"),
        }
    }
}

async fn close_session(session: Box<dyn BrowserSession>) {
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser session");
    }
}

/// Extractor tags in order, then caller tags not already present
/// (case-insensitive). Blank caller tags are dropped.
fn merge_tags(mut tags: Vec<String>, extra: &[String]) -> Vec<String> {
    for tag in extra {
        let tag = tag.trim();
        if tag.is_empty() || tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            continue;
        }
        tags.push(tag.to_string());
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merge_keeps_extractor_order_and_skips_duplicates() {
        let merged = merge_tags(
            strings(&["#ex25", "#build"]),
            &strings(&["#EX25", " #ship ", "", "#build"]),
        );
        assert_eq!(merged, strings(&["#ex25", "#build", "#ship"]));
    }

    #[test]
    fn merge_with_nothing_extracted_uses_caller_tags() {
        assert_eq!(merge_tags(Vec::new(), &strings(&["#a"])), strings(&["#a"]));
        assert!(merge_tags(Vec::new(), &[]).is_empty());
    }

    #[test]
    fn stages_are_ordered() {
        assert!(PipelineStage::Idle < PipelineStage::Rendering);
        assert!(PipelineStage::Probing < PipelineStage::Done);
        assert_eq!(PipelineStage::Extracting.to_string(), "extracting");
    }
}
