use std::fmt;

use darkroom_graph::{GraphError, ValidationError};

/// Why an operation was refused while leaving the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    DuplicateName(String),
    ActivateInvalid { pipeline_id: u64 },
    DeleteActive { pipeline_id: u64 },
    UpdateActive { pipeline_id: u64 },
    StaleVersion { expected: u32, actual: u32 },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::DuplicateName(name) => {
                write!(f, "pipeline with name '{}' already exists", name)
            }
            Conflict::ActivateInvalid { pipeline_id } => write!(
                f,
                "cannot activate invalid pipeline {}; fix validation errors first",
                pipeline_id
            ),
            Conflict::DeleteActive { pipeline_id } => write!(
                f,
                "cannot delete active pipeline {}; deactivate it first",
                pipeline_id
            ),
            Conflict::UpdateActive { pipeline_id } => write!(
                f,
                "cannot update active pipeline {}; deactivate it first",
                pipeline_id
            ),
            Conflict::StaleVersion { expected, actual } => write!(
                f,
                "update was based on version {} but the pipeline is at version {}",
                expected, actual
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    NotFound { kind: &'static str, id: String },
    /// Malformed payload: the graph cannot even be constructed. Never
    /// stored.
    Structural(String),
    StateConflict(Conflict),
    /// Preview requested against a pipeline whose last validation
    /// failed. Carries the full ordered error list.
    PipelineInvalid(Vec<ValidationError>),
    Io(String),
    Json(String),
    Yaml(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "{} {} not found", kind, id),
            StoreError::Structural(msg) => write!(f, "malformed pipeline payload: {}", msg),
            StoreError::StateConflict(conflict) => write!(f, "{}", conflict),
            StoreError::PipelineInvalid(errors) => {
                writeln!(f, "pipeline is invalid ({} error(s)):", errors.len())?;
                for err in errors {
                    writeln!(f, "  - {}", err)?;
                }
                Ok(())
            }
            StoreError::Io(msg) => write!(f, "io error: {}", msg),
            StoreError::Json(msg) => write!(f, "json error: {}", msg),
            StoreError::Yaml(msg) => write!(f, "yaml error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<GraphError> for StoreError {
    fn from(err: GraphError) -> Self {
        StoreError::Structural(err.to_string())
    }
}

impl From<Conflict> for StoreError {
    fn from(conflict: Conflict) -> Self {
        StoreError::StateConflict(conflict)
    }
}
