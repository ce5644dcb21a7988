use std::path::PathBuf;
use thiserror::Error;

/// Pipeline-wide error type. Transport and parse failures inside the AI
/// classifier are recovered locally and never surface here; these variants
/// cover the fatal paths and the applier's filesystem work.
#[derive(Error, Debug)]
pub enum AutofileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dump path not found: {0}")]
    DumpNotFound(PathBuf),

    #[error("Project not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("Auto-intake requires a project name (in the marker file, --project, or AUTOFILE_DEFAULT_PROJECT)")]
    MissingProject,

    #[error("{0}")]
    Other(String),
}
