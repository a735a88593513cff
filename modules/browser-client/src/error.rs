use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Browser connect failed ({url}): {message}")]
    Connect { url: String, message: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {timeout_secs}s loading {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Browser session close failed: {0}")]
    Closed(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Evaluation(err.to_string())
    }
}
