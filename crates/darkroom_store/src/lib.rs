//! Pipeline registry with versioning, activation, and YAML
//! import/export, backed by a JSON store file.

pub mod error;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod store;

// Re-export main types for convenience
pub use error::{Conflict, StoreError};
pub use export::PipelineDocument;
pub use history::PipelineHistoryEntry;
pub use pipeline::{CreatePipeline, Pipeline, PipelineStats, UpdatePipeline};
pub use store::{ActivePolicy, ListFilter, PipelineStore};
