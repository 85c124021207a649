//! error types for tailmap-types

use std::path::PathBuf;

use thiserror::Error;

/// errors that can occur in tailmap-types
#[derive(Debug, Error)]
pub enum Error {
    /// config file could not be read
    #[error("failed to read config file {path:?}: {source}")]
    ConfigRead {
        /// path of the config file
        path: PathBuf,
        /// underlying io error
        source: std::io::Error,
    },

    /// config file is not valid toml for [`crate::Config`]
    #[error("failed to parse config file {path:?}: {source}")]
    ConfigParse {
        /// path of the config file
        path: PathBuf,
        /// underlying toml error
        source: toml::de::Error,
    },
}
