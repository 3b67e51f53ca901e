use serde::{Deserialize, Serialize};

use darkroom_graph::{GraphError, PipelineEdge, PipelineGraph, PipelineNode, ValidationError};

/// Aggregate root: a named, versioned pipeline graph plus its cached
/// validation result. The stored graph may be invalid; the cached
/// `is_valid`/`validation_errors` pair is recomputed on every structural
/// mutation so it can never go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<PipelineNode>,
    pub edges: Vec<PipelineEdge>,
    pub version: u32,
    pub is_active: bool,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
    pub created_at: String,
    pub updated_at: String,
}

impl Pipeline {
    /// Materialize the traversal view of this pipeline's graph. A stored
    /// pipeline is always well-shaped, so this only fails if the stored
    /// invariants were broken externally.
    pub fn graph(&self) -> Result<PipelineGraph, GraphError> {
        PipelineGraph::new(self.nodes.clone(), self.edges.clone())
    }
}

/// Payload for creating a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<PipelineNode>,
    #[serde(default)]
    pub edges: Vec<PipelineEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
}

/// Payload for updating a pipeline. Absent fields are left untouched.
/// `expected_version` enables the optimistic stale-update check: an
/// update submitted against an older version is refused rather than
/// silently overwriting a newer one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<PipelineNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<PipelineEdge>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u32>,
}

/// Dashboard KPI surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub valid_pipelines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_pipeline_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_pipeline_name: Option<String>,
}
