//! the `build` subcommand - write the graph document for a policy.

use clap::Args;
use color_eyre::eyre::{Context, Result};
use tailmap_state::GraphStore;
use tracing::info;

use super::{GlobalArgs, OutputArgs, PolicyArgs, is_stdout};
use crate::{GraphDocument, load_policy, render_graph, write_graph};

/// build the graph and write it out
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// which policy to read
    #[command(flatten)]
    pub policy: PolicyArgs,

    /// where and how to write the graph
    #[command(flatten)]
    pub output: OutputArgs,
}

impl BuildCommand {
    /// run the build command
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.setup(&self.policy, Some(&self.output))?;

        let loaded = load_policy(&config.policy_file, &config.node_colors)
            .with_context(|| format!("failed to load policy: {:?}", config.policy_file))?;
        let policy = loaded.stats();
        let store = GraphStore::new(loaded.graph);
        let snapshot = store.current();
        let document = GraphDocument::new(&snapshot, policy);

        if is_stdout(&config.output_file) {
            println!("{}", render_graph(&document, self.output.format)?);
            return Ok(());
        }

        write_graph(&config.output_file, &document, self.output.format)?;
        info!(output = ?config.output_file, "graph written");
        println!(
            "Wrote {} nodes and {} edges to {:?}",
            document.stats.total_nodes, document.stats.total_edges, config.output_file
        );
        for warning in &snapshot.graph.warnings {
            println!("warning: {}", warning);
        }

        Ok(())
    }
}
