pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ExtractionPreset, LlmProvider};
pub use error::{ExtractionError, PipelineError, RenderError};
pub use types::*;
