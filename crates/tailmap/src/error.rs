//! error types for the tailmap pipeline

use std::path::PathBuf;

use thiserror::Error;

/// errors from loading a policy or writing a graph document
#[derive(Debug, Error)]
pub enum Error {
    /// the policy failed to parse or validate
    #[error(transparent)]
    Policy(#[from] tailmap_policy::Error),

    /// json rendering failed
    #[error("failed to render graph as json: {0}")]
    Json(#[from] serde_json::Error),

    /// yaml rendering failed
    #[error("failed to render graph as yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// the output file could not be written
    #[error("failed to write graph to {path:?}: {source}")]
    Write {
        /// output path
        path: PathBuf,
        /// underlying io error
        source: std::io::Error,
    },
}
