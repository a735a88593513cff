pub mod extractor;
pub mod pipeline;
pub mod probe;
pub mod reconciler;
pub mod renderer;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod chain_tests;

pub use extractor::{ExtractionField, ExtractionProfile, Extractor};
pub use pipeline::{Pipeline, PipelineStage};
pub use probe::Probe;
pub use reconciler::reconcile;
pub use renderer::Renderer;
