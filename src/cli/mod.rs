//! CLI module for image-promoter
//!
//! Provides command-line interface for:
//! - check: run the pre-promotion checks for a pull request
//! - audit: verify registry notifications against the manifests

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{audit, build_edges, check, check_with, run, run_command, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{forward_lines, write_response};
