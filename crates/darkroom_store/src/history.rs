use serde::{Deserialize, Serialize};

use darkroom_graph::{PipelineEdge, PipelineNode, ValidationError};

/// Immutable snapshot of a pipeline as it was at one version. Exactly one
/// entry exists per version a pipeline has ever reached; entries are
/// never rewritten or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineHistoryEntry {
    pub id: u64,
    pub version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<PipelineNode>,
    pub edges: Vec<PipelineEdge>,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    pub created_at: String,
}
