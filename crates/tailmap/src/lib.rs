//! tailmap library - the policy to graph pipeline.
//!
//! - [`load_policy`]: read, parse, validate and build in one step
//! - [`reload_store`]: rebuild into a shared [`GraphStore`]
//! - [`GraphDocument`] and [`write_graph`]: the rendered output
//! - [`cli`]: command-line interface implementation

#![warn(missing_docs)]

pub mod cli;
mod error;

pub use error::Error;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use tailmap_graph::{GraphBuilder, GraphStats, NetworkGraph};
use tailmap_policy::{ParsedPolicy, PolicyStats};
use tailmap_state::{GraphSnapshot, GraphStore};
use tailmap_types::NodeColors;
use tracing::{debug, info};

/// result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// a parsed policy and the graph built from it.
#[derive(Debug, Clone)]
pub struct LoadedPolicy {
    /// the validated policy and its rule lines.
    pub policy: ParsedPolicy,
    /// the graph derived from it.
    pub graph: NetworkGraph,
}

impl LoadedPolicy {
    /// entry counts of the policy.
    pub fn stats(&self) -> PolicyStats {
        self.policy.document.stats()
    }
}

/// read, parse and validate the policy at `path`, then build its graph.
pub fn load_policy(path: &Path, colors: &NodeColors) -> Result<LoadedPolicy> {
    info!(?path, "loading policy");
    let policy = tailmap_policy::parse_file(path)?;
    let graph = GraphBuilder::new(&policy.document, &policy.lines)
        .with_colors(colors.clone())
        .build();
    Ok(LoadedPolicy { policy, graph })
}

/// outcome of a successful [`reload_store`].
#[derive(Debug, Clone)]
pub struct Reloaded {
    /// the snapshot that is now current.
    pub snapshot: Arc<GraphSnapshot>,
    /// entry counts of the policy it was built from.
    pub policy: PolicyStats,
}

/// rebuild the graph from `path` and publish it to `store`.
///
/// a failed load leaves the store untouched.
pub fn reload_store(store: &GraphStore, path: &Path, colors: &NodeColors) -> Result<Reloaded> {
    let mut policy = PolicyStats::default();
    let snapshot = store.reload(|| {
        let loaded = load_policy(path, colors)?;
        policy = loaded.stats();
        Ok::<_, Error>(loaded.graph)
    })?;
    Ok(Reloaded { snapshot, policy })
}

/// output format for graph documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// pretty-printed json
    #[default]
    Json,
    /// yaml
    Yaml,
}

/// the document written to disk: the graph plus summary counts.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDocument<'a> {
    /// store generation the graph came from.
    pub generation: u64,
    /// when the graph was published.
    pub built_at: DateTime<Utc>,
    /// entry counts of the source policy.
    pub policy: PolicyStats,
    /// node and edge counts of the graph.
    pub stats: GraphStats,
    /// the graph itself.
    pub graph: &'a NetworkGraph,
}

impl<'a> GraphDocument<'a> {
    /// describe a published snapshot.
    pub fn new(snapshot: &'a GraphSnapshot, policy: PolicyStats) -> Self {
        Self {
            generation: snapshot.generation,
            built_at: snapshot.built_at,
            policy,
            stats: snapshot.graph.stats(),
            graph: &snapshot.graph,
        }
    }
}

/// render a graph document in `format`.
pub fn render_graph(document: &GraphDocument<'_>, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(document)?,
        OutputFormat::Yaml => serde_yaml::to_string(document)?,
    })
}

/// render a graph document and write it to `path`.
pub fn write_graph(path: &Path, document: &GraphDocument<'_>, format: OutputFormat) -> Result<()> {
    let rendered = render_graph(document, format)?;
    std::fs::write(path, rendered).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, ?format, "wrote graph document");
    Ok(())
}
