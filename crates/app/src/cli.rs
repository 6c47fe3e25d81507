use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fieldbridge")]
#[command(about = "Keeps FSS jobs and CRM appointments in step", version)]
pub struct Cli {
    /// Read configuration from this file instead of the environment
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run both schedulers until Ctrl-C
    Run,
    /// One appointment pass over every enabled location plus one quote poll
    RunOnce,
}

impl Cli {
    /// `run` when no subcommand is given.
    pub fn command(&self) -> Command {
        self.cmd.unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["fieldbridge"]).unwrap();
        assert_eq!(cli.command(), Command::Run);
        assert!(cli.config.is_none());
    }

    #[test]
    fn run_once_with_config_file() {
        let cli = Cli::try_parse_from(["fieldbridge", "run-once", "--config", "/etc/fieldbridge.toml"]).unwrap();
        assert_eq!(cli.command(), Command::RunOnce);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/fieldbridge.toml")));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["fieldbridge", "sync-everything"]).is_err());
    }
}
