//! configuration types for tailmap

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Error;

/// main configuration for tailmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// path to the policy file (json or hujson).
    pub policy_file: PathBuf,

    /// path the rendered graph document is written to.
    pub output_file: PathBuf,

    /// log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// node and edge colors used for display metadata.
    pub node_colors: NodeColors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy_file: PathBuf::from("policy.hujson"),
            output_file: PathBuf::from("network_graph.json"),
            log_level: "info".to_string(),
            node_colors: NodeColors::default(),
        }
    }
}

impl Config {
    /// load a config from a toml file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// parse a config from toml text. missing keys fall back to defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// colors for graph nodes (by type) and edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeColors {
    /// color for group and autogroup nodes.
    pub group: String,
    /// color for tag nodes.
    pub tag: String,
    /// color for host nodes.
    pub host: String,
    /// color for edges.
    pub edge: String,
}

impl Default for NodeColors {
    fn default() -> Self {
        Self {
            group: "#FFFF00".to_string(),
            tag: "#00cc66".to_string(),
            host: "#ff6666".to_string(),
            edge: "#848484".to_string(),
        }
    }
}
