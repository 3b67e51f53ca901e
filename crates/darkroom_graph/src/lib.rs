//! Typed pipeline graphs for photo workflows: the node/edge vocabulary,
//! the structural/semantic validator, and the deterministic filename
//! deriver. Pure logic over in-memory snapshots; no I/O, no clock.

pub mod edge;
pub mod graph;
pub mod node;
pub mod preview;
pub mod validation;

// Re-export main types for convenience
pub use edge::PipelineEdge;
pub use graph::{GraphError, PipelineGraph};
pub use node::{BranchCondition, Classification, NodeId, NodeKind, PipelineNode};
pub use preview::{
    preview, ExpectedFile, FilenamePreview, PreviewError, PreviewInputs, ReachedTermination,
};
pub use validation::{validate, ValidationError, ValidationErrorKind, ValidationReport};
