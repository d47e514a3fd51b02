//! Application layer: use cases orchestrating domain, model and ports.

mod pipeline;

pub use pipeline::{PipelineConfig, PipelineService, RunSummary};
