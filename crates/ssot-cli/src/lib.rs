//! SSOT CLI - run change plans from files
//!
//! - `execute`: process a request against in-memory stores seeded from a
//!   structure file and print the response with the resulting records
//! - `validate`: dry-run the same pipeline without persisting anything

#![warn(unreachable_pub)]

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use serde::Serialize;
use ssot_model::{ExecuteSSOTChangesRequest, ExecuteSSOTChangesResponse, SSOTPendingChange};
use ssot_processor::{
    Alert, ChangePlanProcessor, InMemoryAlertSink, InMemoryPendingChangeStore,
    InMemoryStructureStore, PendingChangeStore, ProcessorConfig, StructureSnapshot, StructureStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Everything one `execute` run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Processor response
    pub response: ExecuteSSOTChangesResponse,
    /// Records of the company after the run
    pub pending_changes: Vec<SSOTPendingChange>,
    /// Structure of the company after the run
    pub structure: StructureSnapshot,
    /// Alerts raised during the run
    pub alerts: Vec<Alert>,
}

/// Command-line definition
#[must_use]
pub fn command() -> Command {
    let request = Arg::new("request")
        .long("request")
        .short('r')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON file holding an ExecuteSSOTChangesRequest");
    let structure = Arg::new("structure")
        .long("structure")
        .short('s')
        .value_parser(value_parser!(PathBuf))
        .help("JSON file holding the company structure (empty if omitted)");
    let config = Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("TOML processor configuration");

    Command::new("ssot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate and record SSOT change plans")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("execute")
                .about("Execute a change plan against in-memory stores")
                .arg(request.clone())
                .arg(structure.clone())
                .arg(config.clone()),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a change plan without persisting anything")
                .arg(request)
                .arg(structure)
                .arg(config),
        )
}

/// Install the tracing subscriber
///
/// Filter comes from `RUST_LOG` (default `warn`). Logs go to stderr so
/// stdout stays machine-readable.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Ignore a subscriber installed earlier (tests)
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Read a request file
///
/// # Errors
/// Fails when the file cannot be read or is not a valid request.
pub fn load_request(path: &Path) -> Result<ExecuteSSOTChangesRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
}

/// Read a structure file, or start from an empty structure
///
/// # Errors
/// Fails when the file cannot be read or is not a valid structure.
pub fn load_structure(path: Option<&Path>) -> Result<StructureSnapshot> {
    let Some(path) = path else {
        return Ok(StructureSnapshot::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading structure {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing structure {}", path.display()))
}

/// Read a configuration file, or use defaults
///
/// # Errors
/// Fails when the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<ProcessorConfig> {
    match path {
        Some(path) => Ok(ProcessorConfig::load(path)?),
        None => Ok(ProcessorConfig::default()),
    }
}

/// Execute a request against in-memory stores seeded with `structure`
///
/// # Errors
/// Fails only when the resulting records cannot be listed; processing
/// failures are reported in the response.
pub async fn execute(
    request: &ExecuteSSOTChangesRequest,
    structure: StructureSnapshot,
    config: ProcessorConfig,
) -> Result<RunOutput> {
    let policy = request.config.unwrap_or(config.update);
    let company_id = ChangePlanProcessor::resolve_company(request, &policy).ok();

    let structure_store = Arc::new(InMemoryStructureStore::new());
    let pending = Arc::new(InMemoryPendingChangeStore::new());
    let alerts = Arc::new(InMemoryAlertSink::new());
    if let Some(company_id) = &company_id {
        structure_store.insert_snapshot(company_id.clone(), structure);
    }

    let processor = ChangePlanProcessor::new(
        config,
        structure_store.clone(),
        pending.clone(),
        alerts.clone(),
    );
    let response = processor.execute_change_plan(request).await;
    tracing::debug!(
        "Run finished: {} processed, {} alerts",
        response.changes_processed,
        alerts.alerts().len()
    );

    let (pending_changes, structure) = match &company_id {
        Some(company_id) => (
            pending.list_for_company(company_id).await?,
            structure_store.snapshot(company_id).await?,
        ),
        None => (Vec::new(), StructureSnapshot::default()),
    };

    Ok(RunOutput {
        response,
        pending_changes,
        structure,
        alerts: alerts.alerts(),
    })
}

/// Dry-run a request against `structure`
#[must_use]
pub fn validate(
    request: &ExecuteSSOTChangesRequest,
    structure: StructureSnapshot,
    config: ProcessorConfig,
) -> ExecuteSSOTChangesResponse {
    let processor = ChangePlanProcessor::new(
        config,
        Arc::new(InMemoryStructureStore::new()),
        Arc::new(InMemoryPendingChangeStore::new()),
        Arc::new(InMemoryAlertSink::new()),
    );
    processor.preview_plan(request, structure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn execute_requires_request() {
        let missing = command().try_get_matches_from(["ssot", "execute"]);
        assert!(missing.is_err());

        let ok = command()
            .try_get_matches_from(["ssot", "--log-json", "validate", "-r", "plan.json"])
            .unwrap();
        assert!(ok.get_flag("log-json"));
        let (name, args) = ok.subcommand().unwrap();
        assert_eq!(name, "validate");
        assert_eq!(
            args.get_one::<PathBuf>("request"),
            Some(&PathBuf::from("plan.json"))
        );
    }

    #[test]
    fn missing_files_use_defaults() {
        assert!(load_structure(None).unwrap().is_empty());
        assert_eq!(load_config(None).unwrap(), ProcessorConfig::default());
    }
}
