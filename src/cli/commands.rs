//! CLI command implementations
//!
//! `check` gates a manifest change: it builds the candidate edge set and
//! runs the removal and size checks over it. The size check needs an
//! inventory snapshot and is skipped without one. `audit` keeps a verifier over
//! the current edge set and classifies notifications read from stdin until
//! EOF or Ctrl-C.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};

use crate::audit::{
    AuditService, AuditSummary, AuditVerifier, FileTransactionLog, StdoutTransactionLog,
    TransactionLog,
};
use crate::checks::{
    run_checks, GitRevisionReader, ImageRemovalCheck, ImageSizeCheck, PreCheck, RevisionConfig,
    SharedWorktree,
};
use crate::edge::{EdgeBuilder, EdgeSet};
use crate::manifest::ManifestLoader;
use crate::observability::{log_event_with_fields, Event};
use crate::registry::{RegistryInventory, MAX_CONVERTIBLE_MIB};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{forward_lines, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Manifest directory, relative to `repo_path` (required)
    pub manifest_dir: String,

    /// Manifest repository clone (optional, default ".")
    #[serde(default = "default_repo_path")]
    pub repo_path: String,

    /// Registry inventory snapshot in JSON (optional)
    #[serde(default)]
    pub inventory_path: Option<String>,

    /// Size ceiling in MiB (optional, default 2048)
    #[serde(default = "default_max_image_size_mib")]
    pub max_image_size_mib: i64,

    /// Transaction log file (optional, stdout when absent)
    #[serde(default)]
    pub audit_log_path: Option<String>,

    /// Capacity of the audit event channel (optional, default 1024)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_repo_path() -> String {
    ".".to_string()
}
fn default_max_image_size_mib() -> i64 {
    2048
}
fn default_event_buffer() -> usize {
    1024
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.manifest_dir.trim().is_empty() {
            return Err(CliError::config_error("manifest_dir must not be empty"));
        }

        if self.max_image_size_mib <= 0 {
            return Err(CliError::config_error("max_image_size_mib must be > 0"));
        }
        if self.max_image_size_mib > MAX_CONVERTIBLE_MIB {
            return Err(CliError::config_error(format!(
                "max_image_size_mib must be <= {}",
                MAX_CONVERTIBLE_MIB
            )));
        }

        // mpsc::channel panics on zero capacity
        if self.event_buffer == 0 {
            return Err(CliError::config_error("event_buffer must be > 0"));
        }

        Ok(())
    }

    /// Directory the manifests are discovered under.
    pub fn manifest_root(&self) -> PathBuf {
        Path::new(&self.repo_path).join(&self.manifest_dir)
    }

    /// Load the inventory snapshot, if one is configured.
    pub fn load_inventory(&self) -> CliResult<Option<RegistryInventory>> {
        match &self.inventory_path {
            Some(path) => Ok(Some(RegistryInventory::load(Path::new(path))?)),
            None => Ok(None),
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Audit { config } => audit(&config),
    }
}

/// Load the manifests under `root` and build their edge set.
pub fn build_edges(root: &Path, inventory: Option<&RegistryInventory>) -> CliResult<EdgeSet> {
    let snapshot = ManifestLoader::new(root).load()?;
    let builder = match inventory {
        Some(inventory) => EdgeBuilder::with_resolver(inventory),
        None => EdgeBuilder::new(),
    };
    Ok(builder.build(&snapshot)?)
}

/// Run every pre-promotion check for the current pull request.
///
/// Revisions are validated before the repository is touched.
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let revisions = RevisionConfig::from_env()?;
    check_with(&config, revisions)
}

/// `check` with explicit revisions.
pub fn check_with(config: &Config, revisions: RevisionConfig) -> CliResult<()> {
    let inventory = config.load_inventory()?;
    let edges = build_edges(&config.manifest_root(), inventory.as_ref())?;

    let pending = match &inventory {
        Some(inventory) => edges.pending_against(inventory).len(),
        None => edges.len(),
    };

    let reader = GitRevisionReader::open(&config.repo_path, &config.manifest_dir)?;
    let removal = ImageRemovalCheck::new(revisions, SharedWorktree::new(reader), edges.clone());
    let size = size_check(config, &edges, inventory.as_ref())?;

    let mut checks: Vec<&dyn PreCheck> = vec![&removal];
    if let Some(size) = &size {
        checks.push(size);
    }
    run_checks(&checks)?;

    write_response(json!({
        "checks_passed": true,
        "edges": edges.len(),
        "pending": pending,
        "size_checked": size.is_some(),
    }))
}

/// The size check, or `None` when no inventory supplies image sizes.
fn size_check(
    config: &Config,
    edges: &EdgeSet,
    inventory: Option<&RegistryInventory>,
) -> CliResult<Option<ImageSizeCheck>> {
    match inventory {
        Some(inventory) => Ok(Some(ImageSizeCheck::new(
            config.max_image_size_mib,
            edges.clone(),
            inventory.sizes.clone(),
        )?)),
        None => {
            log_event_with_fields(
                Event::CheckSkipped,
                &[("check", "ImageSizeCheck"), ("reason", "no inventory_path configured")],
            );
            Ok(None)
        }
    }
}

/// Verify registry notifications from stdin against the current manifests.
///
/// Fails if any transaction was rejected.
pub fn audit(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let inventory = config.load_inventory()?;
    let edges = build_edges(&config.manifest_root(), inventory.as_ref())?;

    let log: Arc<dyn TransactionLog> = match &config.audit_log_path {
        Some(path) => Arc::new(FileTransactionLog::open(path)?),
        None => Arc::new(StdoutTransactionLog),
    };
    let service = AuditService::new(Arc::new(AuditVerifier::new(&edges)), log);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve_audit(&service, config.event_buffer));
    // The stdin reader may still be parked on a blocking read.
    runtime.shutdown_background();

    let summary = result?;
    if summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::audit_rejected(summary.rejected))
    }
}

async fn serve_audit(service: &AuditService, buffer: usize) -> CliResult<AuditSummary> {
    let (events_tx, events_rx) = mpsc::channel(buffer);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reader = tokio::spawn(forward_lines(BufReader::new(tokio::io::stdin()), events_tx));

    let run = service.run(events_rx, shutdown_rx);
    tokio::pin!(run);

    let summary = tokio::select! {
        result = &mut run => result?,
        Ok(()) = tokio::signal::ctrl_c() => {
            let _ = shutdown_tx.send(true);
            run.await?
        }
    };

    reader.abort();
    Ok(summary)
}
