//! the `watch` subcommand - keep the graph current across policy edits.
//!
//! sending SIGHUP rebuilds the graph from the policy file and rewrites the
//! output. A policy that fails to load is logged and the previous output stays
//! in place.

use std::sync::Arc;

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use tailmap_state::GraphStore;
use tailmap_types::Config;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

use super::{GlobalArgs, OutputArgs, PolicyArgs, is_stdout};
use crate::{GraphDocument, OutputFormat, load_policy, reload_store, write_graph};

/// build, then rebuild on SIGHUP
#[derive(Args, Debug)]
pub struct WatchCommand {
    /// which policy to read
    #[command(flatten)]
    pub policy: PolicyArgs,

    /// where and how to write the graph
    #[command(flatten)]
    pub output: OutputArgs,
}

impl WatchCommand {
    /// run the watch command until interrupted
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.setup(&self.policy, Some(&self.output))?;
        if is_stdout(&config.output_file) {
            bail!("watch needs an output file, not stdout");
        }
        let format = self.output.format;

        let loaded = load_policy(&config.policy_file, &config.node_colors)
            .with_context(|| format!("failed to load policy: {:?}", config.policy_file))?;
        let policy = loaded.stats();
        let store = Arc::new(GraphStore::new(loaded.graph));
        let snapshot = store.current();
        write_graph(
            &config.output_file,
            &GraphDocument::new(&snapshot, policy),
            format,
        )?;
        info!(
            output = ?config.output_file,
            "graph written, send SIGHUP to rebuild"
        );

        let mut sighup =
            signal(SignalKind::hangup()).context("failed to register SIGHUP handler")?;

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading policy from {:?}", config.policy_file);
                    rebuild(&store, &config, format);
                }
                result = tokio::signal::ctrl_c() => {
                    result.context("failed to listen for ctrl-c")?;
                    info!("Interrupted, exiting");
                    return Ok(());
                }
            }
        }
    }
}

fn rebuild(store: &GraphStore, config: &Config, format: OutputFormat) {
    let reloaded = match reload_store(store, &config.policy_file, &config.node_colors) {
        Ok(reloaded) => reloaded,
        Err(e) => {
            error!("Failed to reload policy: {}", e);
            return;
        }
    };

    let document = GraphDocument::new(&reloaded.snapshot, reloaded.policy);
    if let Err(e) = write_graph(&config.output_file, &document, format) {
        error!("Failed to write graph: {}", e);
        return;
    }
    info!(
        generation = reloaded.snapshot.generation,
        nodes = document.stats.total_nodes,
        edges = document.stats.total_edges,
        "Graph rebuilt"
    );
}
