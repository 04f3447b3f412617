use anyhow::{Context, Result};
use clap::ArgMatches;
use ssot_model::ValidationStatus;
use std::path::PathBuf;

struct Inputs {
    request: ssot_model::ExecuteSSOTChangesRequest,
    structure: ssot_processor::StructureSnapshot,
    config: ssot_processor::ProcessorConfig,
}

fn inputs(args: &ArgMatches) -> Result<Inputs> {
    let request = args
        .get_one::<PathBuf>("request")
        .context("--request is required")?;
    Ok(Inputs {
        request: ssot_cli::load_request(request)?,
        structure: ssot_cli::load_structure(args.get_one::<PathBuf>("structure").map(PathBuf::as_path))?,
        config: ssot_cli::load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = ssot_cli::command().get_matches();
    ssot_cli::init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("execute", args)) => {
            let Inputs {
                request,
                structure,
                config,
            } = inputs(args)?;

            let output = ssot_cli::execute(&request, structure, config).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);

            std::process::exit(if output.response.success { 0 } else { 1 });
        }
        Some(("validate", args)) => {
            let Inputs {
                request,
                structure,
                config,
            } = inputs(args)?;

            let response = ssot_cli::validate(&request, structure, config);
            println!("{}", serde_json::to_string_pretty(&response)?);

            let clean = response.success
                && response
                    .results
                    .iter()
                    .all(|r| r.validation_status == ValidationStatus::Valid);
            std::process::exit(if clean { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}
