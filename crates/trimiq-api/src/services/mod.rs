//! Background services and the in-process pipeline.

mod cleanup;
mod pipeline;
mod registry;

pub use cleanup::CleanupService;
pub use pipeline::{run_pipeline, PipelineInput};
pub use registry::JobRegistry;
