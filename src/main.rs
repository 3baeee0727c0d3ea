//! Runs a JSON block plan through the merge engine and prints the resulting
//! binding table followed by the projection as JSON.

use std::fs;
use std::path::PathBuf;
use std::process;

use bindmerge::{BindingError, Plan, Result, Settings};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Fold the blocks of a query plan into one binding table
#[derive(Parser, Debug)]
#[command(name = "bindmerge")]
#[command(about = "Runs a JSON block plan through the binding merge engine")]
struct Args {
    /// Settings file (defaults to an optional bindmerge.{toml,json,..} in the working directory)
    #[arg(long)]
    config: Option<String>,

    /// Plan file describing the bindings of each block
    plan: PathBuf,
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let text = fs::read_to_string(&args.plan).map_err(|e| {
        BindingError::Input(format!("cannot read {}: {e}", args.plan.display()))
    })?;
    let plan = Plan::from_json(&text)?;
    info!(blocks = plan.blocks.len(), restricted = settings.restricted, "running plan");
    let evaluation = plan.run(&settings)?;

    print!("{}", evaluation.bindings);
    println!("{}", serde_json::to_string_pretty(&evaluation.response())?);
    report_warnings(&evaluation.warnings);
    Ok(())
}

fn report_warnings(warnings: &[String]) {
    for warning in warnings {
        warn!(%warning, "query warning");
    }
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        error!(%e, "bindmerge failed");
        eprintln!("{e}");
        process::exit(1);
    }
}
