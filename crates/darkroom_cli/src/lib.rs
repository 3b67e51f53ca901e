//! Command implementations for the `darkroom` binary. Each function
//! loads the store file, applies one operation, and saves the store
//! back when it mutated anything. The binary in `main.rs` is a thin
//! clap layer over these.

use std::fs;
use std::path::{Path, PathBuf};

use darkroom_graph::{FilenamePreview, PreviewInputs, ValidationReport};
use darkroom_store::{
    CreatePipeline, ListFilter, Pipeline, PipelineDocument, PipelineHistoryEntry, PipelineStats,
    PipelineStore, UpdatePipeline,
};

pub fn default_store_path() -> PathBuf {
    PathBuf::from("pipelines.json")
}

fn load(store_path: &Path) -> Result<PipelineStore, String> {
    PipelineStore::load(store_path).map_err(|err| err.to_string())
}

fn save(store: &PipelineStore, store_path: &Path) -> Result<(), String> {
    store.save(store_path).map_err(|err| err.to_string())
}

fn read_document(path: &Path) -> Result<PipelineDocument, String> {
    let contents =
        fs::read_to_string(path).map_err(|err| format!("read {}: {}", path.display(), err))?;
    serde_yaml::from_str(&contents).map_err(|err| format!("parse {}: {}", path.display(), err))
}

/// Create a pipeline from a YAML definition file.
pub fn create_pipeline(
    store_path: &Path,
    definition_path: &Path,
    change_summary: Option<String>,
    changed_by: Option<String>,
) -> Result<Pipeline, String> {
    let document = read_document(definition_path)?;
    let mut store = load(store_path)?;
    let pipeline = store
        .create(CreatePipeline {
            name: document.name,
            description: document.description,
            nodes: document.nodes,
            edges: document.edges,
            change_summary,
            changed_by,
        })
        .map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(pipeline)
}

pub fn list_pipelines(store_path: &Path, filter: ListFilter) -> Result<Vec<Pipeline>, String> {
    let store = load(store_path)?;
    Ok(store.list(filter).into_iter().cloned().collect())
}

pub fn show_pipeline(store_path: &Path, id: u64) -> Result<Pipeline, String> {
    let store = load(store_path)?;
    store.get(id).cloned().map_err(|err| err.to_string())
}

/// Apply an update. The graph is replaced only when a definition file
/// is given; name and description edits stand alone and still produce
/// a new version.
pub fn update_pipeline(
    store_path: &Path,
    id: u64,
    definition_path: Option<&Path>,
    name: Option<String>,
    description: Option<String>,
    change_summary: Option<String>,
    changed_by: Option<String>,
    expected_version: Option<u32>,
) -> Result<Pipeline, String> {
    let (mut doc_name, mut nodes, mut edges) = (None, None, None);
    if let Some(path) = definition_path {
        let document = read_document(path)?;
        doc_name = Some(document.name);
        nodes = Some(document.nodes);
        edges = Some(document.edges);
    }
    let mut store = load(store_path)?;
    let pipeline = store
        .update(
            id,
            UpdatePipeline {
                name: name.or(doc_name),
                description,
                nodes,
                edges,
                change_summary,
                changed_by,
                expected_version,
            },
        )
        .map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(pipeline)
}

pub fn delete_pipeline(store_path: &Path, id: u64) -> Result<u64, String> {
    let mut store = load(store_path)?;
    let deleted = store.delete(id).map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(deleted)
}

pub fn validate_pipeline(store_path: &Path, id: u64) -> Result<ValidationReport, String> {
    let mut store = load(store_path)?;
    let report = store.validate_pipeline(id).map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(report)
}

pub fn activate_pipeline(store_path: &Path, id: u64) -> Result<Pipeline, String> {
    let mut store = load(store_path)?;
    let pipeline = store.activate(id).map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(pipeline)
}

pub fn deactivate_pipeline(store_path: &Path, id: u64) -> Result<Pipeline, String> {
    let mut store = load(store_path)?;
    let pipeline = store.deactivate(id).map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(pipeline)
}

pub fn preview_pipeline(
    store_path: &Path,
    id: u64,
    inputs: &PreviewInputs,
) -> Result<FilenamePreview, String> {
    let store = load(store_path)?;
    store.preview(id, inputs).map_err(|err| err.to_string())
}

pub fn pipeline_history(
    store_path: &Path,
    id: u64,
) -> Result<Vec<PipelineHistoryEntry>, String> {
    let store = load(store_path)?;
    store.history(id).map_err(|err| err.to_string())
}

pub fn pipeline_version(store_path: &Path, id: u64, version: u32) -> Result<Pipeline, String> {
    let store = load(store_path)?;
    store.get_version(id, version).map_err(|err| err.to_string())
}

/// YAML for the current version, or for a historical one when
/// `version` is given.
pub fn export_pipeline(
    store_path: &Path,
    id: u64,
    version: Option<u32>,
) -> Result<String, String> {
    let store = load(store_path)?;
    match version {
        Some(version) => store.export_version(id, version),
        None => store.export(id),
    }
    .map_err(|err| err.to_string())
}

pub fn import_pipeline(
    store_path: &Path,
    input_path: &Path,
    changed_by: Option<String>,
) -> Result<Pipeline, String> {
    let yaml = fs::read_to_string(input_path)
        .map_err(|err| format!("read {}: {}", input_path.display(), err))?;
    let mut store = load(store_path)?;
    let pipeline = store
        .import(&yaml, changed_by)
        .map_err(|err| err.to_string())?;
    save(&store, store_path)?;
    Ok(pipeline)
}

pub fn store_stats(store_path: &Path) -> Result<PipelineStats, String> {
    let store = load(store_path)?;
    Ok(store.stats())
}
