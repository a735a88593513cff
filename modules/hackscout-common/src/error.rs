use thiserror::Error;

/// Navigation, timeout or DOM evaluation failure on one page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Render failed for {url}: {message}")]
pub struct RenderError {
    pub url: String,
    pub message: String,
}

impl RenderError {
    pub fn new(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Text generation failed: {0}")]
    Service(String),

    #[error("Model response is not a JSON object: {0}")]
    Decode(String),
}

/// The only failure a pipeline run reports to its caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Browser session unavailable: {0}")]
    Session(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}
