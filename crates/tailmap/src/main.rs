//! tailmap - tailscale policy topology mapper

use clap::Parser;
use color_eyre::eyre::Result;
use tailmap::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Build(cmd) => cmd.run(&cli.global),
        Command::Check(cmd) => cmd.run(&cli.global),
        Command::Watch(cmd) => cmd.run(&cli.global).await,
    }
}
