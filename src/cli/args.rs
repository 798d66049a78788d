//! CLI argument definitions using clap
//!
//! Commands:
//! - image-promoter check --config <path>
//! - image-promoter audit --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Container image promoter gate and registry auditor
#[derive(Parser, Debug)]
#[command(name = "image-promoter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pre-promotion checks against a manifest change.
    ///
    /// Revisions are read from PULL_BASE_SHA and PULL_PULL_SHA.
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./promoter.json")]
        config: PathBuf,
    },

    /// Verify registry notifications read from stdin, one JSON payload per line
    Audit {
        /// Path to configuration file
        #[arg(long, default_value = "./promoter.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["image-promoter", "check", "--config", "/tmp/p.json"]).unwrap();
        match cli.command {
            Command::Check { config } => assert_eq!(config, PathBuf::from("/tmp/p.json")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_audit_default_config() {
        let cli = Cli::try_parse_from(["image-promoter", "audit"]).unwrap();
        match cli.command {
            Command::Audit { config } => assert_eq!(config, PathBuf::from("./promoter.json")),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
