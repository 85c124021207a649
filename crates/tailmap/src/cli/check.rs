//! the `check` subcommand - validate a policy without building a graph.

use clap::Args;
use color_eyre::eyre::{Context, Result};

use super::{GlobalArgs, PolicyArgs};

/// parse and validate a policy
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// which policy to read
    #[command(flatten)]
    pub policy: PolicyArgs,
}

impl CheckCommand {
    /// run the check command
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = global.setup(&self.policy, None)?;

        let parsed = tailmap_policy::parse_file(&config.policy_file)
            .with_context(|| format!("invalid policy: {:?}", config.policy_file))?;
        let stats = parsed.document.stats();

        println!("Policy {:?} is valid", config.policy_file);
        println!("  groups:     {}", stats.groups);
        println!("  hosts:      {}", stats.hosts);
        println!("  tag owners: {}", stats.tag_owners);
        println!("  postures:   {}", stats.postures);
        println!("  acls:       {}", stats.acls);
        println!("  grants:     {}", stats.grants);

        Ok(())
    }
}
