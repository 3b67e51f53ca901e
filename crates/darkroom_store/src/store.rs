use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use darkroom_graph::{
    preview as derive_preview, validate, FilenamePreview, PipelineGraph, PreviewError,
    PreviewInputs, ValidationError, ValidationReport,
};

use crate::error::{Conflict, StoreError};
use crate::history::PipelineHistoryEntry;
use crate::pipeline::{CreatePipeline, Pipeline, PipelineStats, UpdatePipeline};

/// How many pipelines may be active at once. The product default is a
/// single active pipeline (the KPI surface exposes exactly one
/// `active_pipeline_id`); the policy is explicit store configuration
/// rather than a hard-coded rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivePolicy {
    SingleActive,
    MultipleActive,
}

impl Default for ActivePolicy {
    fn default() -> Self {
        ActivePolicy::SingleActive
    }
}

/// Optional filters for listing pipelines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub is_active: Option<bool>,
    pub is_valid: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PipelineRecord {
    pipeline: Pipeline,
    history: Vec<PipelineHistoryEntry>,
}

/// In-memory pipeline registry owning the id counters, each pipeline's
/// current state, and its immutable version history. All mutation goes
/// through `&mut self`, which serializes updates per store; the
/// `expected_version` check on update guards against lost updates from
/// stale callers on top of that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStore {
    #[serde(default)]
    active_policy: ActivePolicy,
    next_pipeline_id: u64,
    next_history_id: u64,
    records: BTreeMap<u64, PipelineRecord>,
}

impl PipelineStore {
    pub fn new() -> Self {
        Self::with_policy(ActivePolicy::default())
    }

    pub fn with_policy(active_policy: ActivePolicy) -> Self {
        PipelineStore {
            active_policy,
            next_pipeline_id: 1,
            next_history_id: 1,
            records: BTreeMap::new(),
        }
    }

    pub fn active_policy(&self) -> ActivePolicy {
        self.active_policy
    }

    // -----------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------

    pub fn create(&mut self, input: CreatePipeline) -> Result<Pipeline, StoreError> {
        if input.name.trim().is_empty() {
            return Err(StoreError::Structural("pipeline name is required".to_string()));
        }
        self.ensure_name_free(&input.name, None)?;

        let graph = PipelineGraph::new(input.nodes.clone(), input.edges.clone())?;
        let report = validate(&graph);

        let now = now();
        let id = self.next_pipeline_id;
        self.next_pipeline_id += 1;

        let pipeline = Pipeline {
            id,
            name: input.name,
            description: input.description,
            nodes: input.nodes,
            edges: input.edges,
            version: 1,
            is_active: false,
            is_valid: report.is_valid,
            validation_errors: none_if_empty(report.errors),
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        // one history entry per version ever reached, version 1 included
        let entry = self.snapshot(&pipeline, input.change_summary, input.changed_by, now);
        self.records.insert(
            id,
            PipelineRecord {
                pipeline: pipeline.clone(),
                history: vec![entry],
            },
        );

        Ok(pipeline)
    }

    pub fn get(&self, id: u64) -> Result<&Pipeline, StoreError> {
        self.records
            .get(&id)
            .map(|r| &r.pipeline)
            .ok_or(not_found(id))
    }

    /// Pipelines matching the filter, most recently updated first.
    pub fn list(&self, filter: ListFilter) -> Vec<&Pipeline> {
        let mut pipelines: Vec<&Pipeline> = self
            .records
            .values()
            .map(|r| &r.pipeline)
            .filter(|p| filter.is_active.is_none_or(|want| p.is_active == want))
            .filter(|p| filter.is_valid.is_none_or(|want| p.is_valid == want))
            .collect();
        pipelines.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        pipelines
    }

    pub fn update(&mut self, id: u64, input: UpdatePipeline) -> Result<Pipeline, StoreError> {
        {
            let current = self.get(id)?;
            if current.is_active {
                return Err(Conflict::UpdateActive { pipeline_id: id }.into());
            }
            if let Some(expected) = input.expected_version {
                if expected != current.version {
                    return Err(Conflict::StaleVersion {
                        expected,
                        actual: current.version,
                    }
                    .into());
                }
            }
        }
        if let Some(name) = &input.name {
            self.ensure_name_free(name, Some(id))?;
        }

        // Build and validate the candidate graph before touching the
        // record, so a structural rejection leaves the store unchanged.
        let (nodes, edges) = {
            let current = self.get(id)?;
            (
                input.nodes.unwrap_or_else(|| current.nodes.clone()),
                input.edges.unwrap_or_else(|| current.edges.clone()),
            )
        };
        let graph = PipelineGraph::new(nodes.clone(), edges.clone())?;
        let report = validate(&graph);
        let now = now();
        let entry_id = self.take_history_id();

        let record = self.records.get_mut(&id).ok_or(not_found(id))?;
        let pipeline = &mut record.pipeline;
        if let Some(name) = input.name {
            pipeline.name = name;
        }
        if let Some(description) = input.description {
            pipeline.description = Some(description);
        }
        pipeline.nodes = nodes;
        pipeline.edges = edges;
        pipeline.version += 1;
        pipeline.is_valid = report.is_valid;
        pipeline.validation_errors = none_if_empty(report.errors);
        pipeline.updated_at = now.clone();

        record.history.push(PipelineHistoryEntry {
            id: entry_id,
            version: record.pipeline.version,
            name: record.pipeline.name.clone(),
            description: record.pipeline.description.clone(),
            nodes: record.pipeline.nodes.clone(),
            edges: record.pipeline.edges.clone(),
            is_valid: record.pipeline.is_valid,
            validation_errors: record.pipeline.validation_errors.clone(),
            change_summary: input.change_summary,
            changed_by: input.changed_by,
            created_at: now,
        });

        Ok(record.pipeline.clone())
    }

    pub fn delete(&mut self, id: u64) -> Result<u64, StoreError> {
        let pipeline = self.get(id)?;
        if pipeline.is_active {
            return Err(Conflict::DeleteActive { pipeline_id: id }.into());
        }
        self.records.remove(&id);
        Ok(id)
    }

    // -----------------------------------------------------------------
    // Validation and activation
    // -----------------------------------------------------------------

    /// Run the validator against the current graph and persist the cached
    /// result on the aggregate.
    pub fn validate_pipeline(&mut self, id: u64) -> Result<ValidationReport, StoreError> {
        let graph = self.get(id)?.graph()?;
        let report = validate(&graph);
        let record = self.records.get_mut(&id).ok_or(not_found(id))?;
        record.pipeline.is_valid = report.is_valid;
        record.pipeline.validation_errors = none_if_empty(report.errors.clone());
        Ok(report)
    }

    /// Activate a pipeline. The validity gate recomputes validation in
    /// the same call, so it can never act on a stale cached result.
    pub fn activate(&mut self, id: u64) -> Result<Pipeline, StoreError> {
        let report = self.validate_pipeline(id)?;
        if !report.is_valid {
            return Err(Conflict::ActivateInvalid { pipeline_id: id }.into());
        }

        let now = now();
        if self.active_policy == ActivePolicy::SingleActive {
            for record in self.records.values_mut() {
                if record.pipeline.id != id && record.pipeline.is_active {
                    record.pipeline.is_active = false;
                    record.pipeline.updated_at = now.clone();
                }
            }
        }

        let record = self.records.get_mut(&id).ok_or(not_found(id))?;
        record.pipeline.is_active = true;
        record.pipeline.updated_at = now;
        Ok(record.pipeline.clone())
    }

    pub fn deactivate(&mut self, id: u64) -> Result<Pipeline, StoreError> {
        let now = now();
        let record = self.records.get_mut(&id).ok_or(not_found(id))?;
        record.pipeline.is_active = false;
        record.pipeline.updated_at = now;
        Ok(record.pipeline.clone())
    }

    // -----------------------------------------------------------------
    // Preview
    // -----------------------------------------------------------------

    pub fn preview(
        &self,
        id: u64,
        inputs: &PreviewInputs,
    ) -> Result<FilenamePreview, StoreError> {
        let graph = self.get(id)?.graph()?;
        derive_preview(&graph, inputs).map_err(|err| match err {
            PreviewError::PipelineInvalid(errors) => StoreError::PipelineInvalid(errors),
        })
    }

    // -----------------------------------------------------------------
    // Version history
    // -----------------------------------------------------------------

    /// History entries for a pipeline, newest first.
    pub fn history(&self, id: u64) -> Result<Vec<PipelineHistoryEntry>, StoreError> {
        let record = self.records.get(&id).ok_or(not_found(id))?;
        let mut entries = record.history.clone();
        entries.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(entries)
    }

    /// A pipeline exactly as it was at `version`: the snapshot's name,
    /// description, graph, and validity, never the current live state.
    /// Historical versions are never active.
    pub fn get_version(&self, id: u64, version: u32) -> Result<Pipeline, StoreError> {
        let record = self.records.get(&id).ok_or(not_found(id))?;
        if version == record.pipeline.version {
            return Ok(record.pipeline.clone());
        }
        let entry = record
            .history
            .iter()
            .find(|e| e.version == version)
            .ok_or(StoreError::NotFound {
                kind: "pipeline version",
                id: format!("{}@{}", id, version),
            })?;
        Ok(Pipeline {
            id: record.pipeline.id,
            name: entry.name.clone(),
            description: entry.description.clone(),
            nodes: entry.nodes.clone(),
            edges: entry.edges.clone(),
            version: entry.version,
            is_active: false,
            is_valid: entry.is_valid,
            validation_errors: entry.validation_errors.clone(),
            created_at: entry.created_at.clone(),
            updated_at: entry.created_at.clone(),
        })
    }

    // -----------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------

    pub fn stats(&self) -> PipelineStats {
        let total_pipelines = self.records.len();
        let valid_pipelines = self
            .records
            .values()
            .filter(|r| r.pipeline.is_valid)
            .count();
        let active = self
            .records
            .values()
            .map(|r| &r.pipeline)
            .find(|p| p.is_active);
        PipelineStats {
            total_pipelines,
            valid_pipelines,
            active_pipeline_id: active.map(|p| p.id),
            active_pipeline_name: active.map(|p| p.name.clone()),
        }
    }

    // -----------------------------------------------------------------
    // Persistence of the store file
    // -----------------------------------------------------------------

    /// Load a store from a JSON file; a missing file yields an empty
    /// store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(PipelineStore::new());
        }
        let contents = fs::read_to_string(path).map_err(|err| StoreError::Io(err.to_string()))?;
        serde_json::from_str(&contents).map_err(|err| StoreError::Json(err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))?;
            }
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|err| StoreError::Json(err.to_string()))?;
        fs::write(path, contents).map_err(|err| StoreError::Io(err.to_string()))
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn ensure_name_free(&self, name: &str, exclude: Option<u64>) -> Result<(), StoreError> {
        let taken = self
            .records
            .values()
            .any(|r| r.pipeline.name == name && Some(r.pipeline.id) != exclude);
        if taken {
            return Err(Conflict::DuplicateName(name.to_string()).into());
        }
        Ok(())
    }

    fn take_history_id(&mut self) -> u64 {
        let id = self.next_history_id;
        self.next_history_id += 1;
        id
    }

    fn snapshot(
        &mut self,
        pipeline: &Pipeline,
        change_summary: Option<String>,
        changed_by: Option<String>,
        created_at: String,
    ) -> PipelineHistoryEntry {
        PipelineHistoryEntry {
            id: self.take_history_id(),
            version: pipeline.version,
            name: pipeline.name.clone(),
            description: pipeline.description.clone(),
            nodes: pipeline.nodes.clone(),
            edges: pipeline.edges.clone(),
            is_valid: pipeline.is_valid,
            validation_errors: pipeline.validation_errors.clone(),
            change_summary,
            changed_by,
            created_at,
        }
    }
}

impl Default for PipelineStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn not_found(id: u64) -> StoreError {
    StoreError::NotFound {
        kind: "pipeline",
        id: id.to_string(),
    }
}

fn none_if_empty(errors: Vec<ValidationError>) -> Option<Vec<ValidationError>> {
    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}
