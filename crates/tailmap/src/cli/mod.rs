//! cli subcommands for tailmap.
//!
//! - `tailmap build` - write the graph document for a policy
//! - `tailmap check` - validate a policy and print its counts
//! - `tailmap watch` - build, then rebuild on every SIGHUP

mod build;
mod check;
mod watch;

pub use build::BuildCommand;
pub use check::CheckCommand;
pub use watch::WatchCommand;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tailmap_types::Config;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use crate::OutputFormat;

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &["/etc/tailmap/config.toml", "./tailmap.toml"];

/// tailmap - tailscale policy topology mapper
#[derive(Parser, Debug)]
#[command(name = "tailmap")]
#[command(about = "Turn Tailscale policy files into network graphs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// the command to run
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// build the graph and write it out
    Build(BuildCommand),

    /// parse and validate a policy without building
    Check(CheckCommand),

    /// build, then rebuild on SIGHUP
    Watch(WatchCommand),
}

/// options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// path to config file (toml format)
    #[arg(short, long, global = true, env = "TAILMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TAILMAP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// shorthand for --log-level debug
    #[arg(long, global = true)]
    pub debug: bool,
}

/// which policy to read
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// path to policy file (json or hujson)
    #[arg(short, long, env = "TAILMAP_POLICY_FILE")]
    pub policy_file: Option<PathBuf>,
}

/// where and how to write the graph
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// output path, or `-` for stdout
    #[arg(short, long, env = "TAILMAP_OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl GlobalArgs {
    /// find and load config file, returning none if no config file is found.
    fn load_config_file(&self) -> Result<Option<Config>> {
        // if explicit path provided, it must exist
        if let Some(path) = &self.config {
            let config = Config::from_file(path)
                .with_context(|| format!("failed to load config file: {:?}", path))?;
            return Ok(Some(config));
        }

        for path in CONFIG_SEARCH_PATHS.iter().map(Path::new) {
            if path.exists() {
                debug!("Found config file at {:?}", path);
                let config = Config::from_file(path)
                    .with_context(|| format!("failed to load config file: {:?}", path))?;
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// merge defaults, the config file and cli flags.
    ///
    /// priority order: defaults -> config file -> cli flags
    pub fn resolve(&self, policy: &PolicyArgs, output: Option<&OutputArgs>) -> Result<Config> {
        let mut config = self.load_config_file()?.unwrap_or_default();

        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.debug {
            config.log_level = "debug".to_string();
        }
        if let Some(policy_file) = &policy.policy_file {
            config.policy_file = policy_file.clone();
        }
        if let Some(output_file) = output.and_then(|o| o.output.as_ref()) {
            config.output_file = output_file.clone();
        }

        Ok(config)
    }

    /// resolve the config and initialize logging from it.
    pub fn setup(&self, policy: &PolicyArgs, output: Option<&OutputArgs>) -> Result<Config> {
        let config = self.resolve(policy, output)?;
        init_logging(&config.log_level)?;
        info!(policy_file = ?config.policy_file, "Starting tailmap...");
        Ok(config)
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// install the global fmt subscriber.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// whether `path` means stdout.
fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use clap::CommandFactory;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_args() {
        let cli = Cli::parse_from([
            "tailmap",
            "--debug",
            "build",
            "--policy-file",
            "p.hujson",
            "-o",
            "-",
            "--format",
            "yaml",
        ]);
        assert!(cli.global.debug);
        let Command::Build(cmd) = cli.command else {
            panic!("expected build command");
        };
        assert_eq!(cmd.policy.policy_file, Some(PathBuf::from("p.hujson")));
        assert_eq!(cmd.output.format, OutputFormat::Yaml);
        assert!(is_stdout(cmd.output.output.as_deref().unwrap()));
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file = config_file(
            r##"
policy_file = "/etc/tailmap/policy.hujson"
output_file = "/var/lib/tailmap/graph.json"
log_level = "warn"

[node_colors]
host = "#123456"
"##,
        );

        let global = GlobalArgs {
            config: Some(file.path().to_path_buf()),
            log_level: None,
            debug: false,
        };
        let policy = PolicyArgs {
            policy_file: Some(PathBuf::from("override.hujson")),
        };
        let config = global.resolve(&policy, None).unwrap();

        // cli overrides should win
        assert_eq!(config.policy_file, PathBuf::from("override.hujson"));
        // config file values should be preserved when not overridden
        assert_eq!(config.output_file, PathBuf::from("/var/lib/tailmap/graph.json"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.node_colors.host, "#123456");
        assert_eq!(config.node_colors.group, "#FFFF00");
    }

    #[test]
    fn test_debug_flag_beats_log_level() {
        let global = GlobalArgs {
            config: None,
            log_level: Some("error".to_string()),
            debug: true,
        };
        let output = OutputArgs {
            output: Some(PathBuf::from("out.json")),
            format: OutputFormat::Json,
        };
        let config = global.resolve(&PolicyArgs::default(), Some(&output)).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output_file, PathBuf::from("out.json"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let global = GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/tailmap.toml")),
            ..GlobalArgs::default()
        };
        let err = global.resolve(&PolicyArgs::default(), None).unwrap_err();
        assert!(format!("{err:?}").contains("failed to load config file"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }
}
