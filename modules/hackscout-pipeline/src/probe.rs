use browser_client::BrowserSession;
use hackscout_common::{ProbeOutcome, TagCount};
use tracing::{info, warn};
use url::Url;

use crate::renderer::Renderer;

/// Media elements at which a tag counts as popular; reported as "100+".
pub const MEDIA_TARGET: u32 = 100;
pub const MAX_SCROLLS: u32 = 10;

const DEFAULT_SEARCH_URL: &str = "https://x.com/search";

/// Counts media results on a social search surface for each tag.
#[derive(Debug, Clone)]
pub struct Probe {
    search_url: String,
    target: u32,
    max_scrolls: u32,
}

impl Default for Probe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe {
    pub fn new() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            target: MEDIA_TARGET,
            max_scrolls: MAX_SCROLLS,
        }
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_limits(mut self, target: u32, max_scrolls: u32) -> Self {
        self.target = target;
        self.max_scrolls = max_scrolls;
        self
    }

    /// Media-filtered search address for one tag.
    pub fn search_url_for(&self, tag: &str) -> Result<String, url::ParseError> {
        let url = Url::parse_with_params(
            &self.search_url,
            &[("q", tag), ("src", "typed_query"), ("f", "media")],
        )?;
        Ok(url.to_string())
    }

    /// Probe tags one after another on the shared session. One entry per tag,
    /// in order; a failed tag never stops the rest.
    pub async fn probe(
        &self,
        renderer: &Renderer,
        session: &mut dyn BrowserSession,
        tags: &[String],
    ) -> Vec<TagCount> {
        let mut counts = Vec::with_capacity(tags.len());

        for tag in tags {
            let outcome = match self.search_url_for(tag) {
                Ok(search_url) => {
                    match renderer
                        .count_media(session, &search_url, self.target, self.max_scrolls)
                        .await
                    {
                        Ok(count) => ProbeOutcome::from_count(count, self.target),
                        Err(e) => {
                            warn!(tag = tag.as_str(), error = %e, "Tag probe failed");
                            ProbeOutcome::Failed
                        }
                    }
                }
                Err(e) => {
                    warn!(tag = tag.as_str(), error = %e, "Could not build search URL");
                    ProbeOutcome::Failed
                }
            };

            info!(tag = tag.as_str(), outcome = ?outcome, "Tag probed");
            counts.push(TagCount {
                tag: tag.clone(),
                outcome,
            });
        }

        counts
    }
}
