use serde::{Deserialize, Serialize};

use darkroom_graph::{PipelineEdge, PipelineNode};

use crate::error::StoreError;
use crate::pipeline::{CreatePipeline, Pipeline};
use crate::store::PipelineStore;

/// Portable pipeline definition: the shareable subset of a pipeline,
/// stripped of store-assigned identity, versioning, and activation
/// state. Importing one always creates a fresh pipeline at version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub nodes: Vec<PipelineNode>,
    pub edges: Vec<PipelineEdge>,
}

impl From<&Pipeline> for PipelineDocument {
    fn from(pipeline: &Pipeline) -> Self {
        PipelineDocument {
            name: pipeline.name.clone(),
            description: pipeline.description.clone(),
            nodes: pipeline.nodes.clone(),
            edges: pipeline.edges.clone(),
        }
    }
}

impl PipelineStore {
    /// Serialize the current version of a pipeline as a YAML document.
    pub fn export(&self, id: u64) -> Result<String, StoreError> {
        let document = PipelineDocument::from(self.get(id)?);
        serde_yaml::to_string(&document).map_err(|err| StoreError::Yaml(err.to_string()))
    }

    /// Serialize a specific historical version as a YAML document.
    pub fn export_version(&self, id: u64, version: u32) -> Result<String, StoreError> {
        let pipeline = self.get_version(id, version)?;
        let document = PipelineDocument::from(&pipeline);
        serde_yaml::to_string(&document).map_err(|err| StoreError::Yaml(err.to_string()))
    }

    /// Create a new pipeline from a YAML document. The usual creation
    /// rules apply: the name must be free, and an invalid graph is
    /// stored with its errors attached rather than rejected.
    pub fn import(&mut self, yaml: &str, changed_by: Option<String>) -> Result<Pipeline, StoreError> {
        let document: PipelineDocument =
            serde_yaml::from_str(yaml).map_err(|err| StoreError::Yaml(err.to_string()))?;
        self.create(CreatePipeline {
            name: document.name,
            description: document.description,
            nodes: document.nodes,
            edges: document.edges,
            change_summary: Some("imported from YAML".to_string()),
            changed_by,
        })
    }
}
