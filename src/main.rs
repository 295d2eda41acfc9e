//! Command-line wrapper around the OGC API - Processes client.

use anyhow::Result;
use clap::{ArgAction, Parser};
use ogc_processes::{Client, ExecutionMode, Function, Request, dispatch};
use std::process;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const LONG_ABOUT: &str = "\
Calls one OGC API - Processes endpoint and prints the JSON answer.

Functions:
  get_landing_page
  get_conformance
  get_process_list          [--limit N]
  get_process_description   --process_id ID
  post_process_execution    --process_id ID [--process_inputs JSON] [--mode auto|sync|async]
  get_job_list
  get_job_status_info       --job_id ID
  get_job_results           --job_id ID
  delete_job                --job_id ID
  wait_for_job              --job_id ID

Without BASE_URL the URL comes from OGCAPI_URL, then .ogcapirc, then the
GeoLabs test server.";

#[derive(Parser, Debug)]
#[command(
    name = "ogc-processes",
    author,
    version,
    about = "Query and drive an OGC API - Processes server",
    long_about = LONG_ABOUT
)]
struct Cli {
    /// API root, e.g. http://tb17.geolabs.fr:8101/ogc-api
    base_url: Option<String>,

    /// Function to call (default: get_process_list)
    function: Option<String>,

    /// Process ID for the process endpoint being queried
    #[arg(long = "process_id", visible_alias = "process-id", default_value = "")]
    process_id: String,

    /// Job ID for the job endpoint being queried
    #[arg(long = "job_id", visible_alias = "job-id", default_value = "")]
    job_id: String,

    /// Maximum number of processes to return (1..=10000)
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    limit: i64,

    /// Process inputs (or a full execute request) as JSON
    #[arg(
        long = "process_inputs",
        visible_alias = "process-inputs",
        default_value = "{}"
    )]
    process_inputs: String,

    /// Execution mode requested through the Prefer header
    #[arg(long, default_value = "auto")]
    mode: ExecutionMode,

    /// Bearer token for servers that require one
    #[arg(long)]
    key: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Do not show a spinner while waiting for a job
    #[arg(long)]
    no_progress: bool,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let (base_url, function_name) = split_positionals(cli.base_url.clone(), cli.function.clone());
    let function = match function_name.parse::<Function>() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Invalid function name. Please try again.");
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = run(&cli, base_url, function) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli, base_url: Option<String>, function: Function) -> Result<()> {
    let verify = if cli.insecure { Some(false) } else { None };
    let client = Client::new(base_url, cli.key.clone(), verify)?.with_progress(!cli.no_progress);
    tracing::debug!(base_url = client.base_url(), %function, "dispatching");

    let request = Request {
        process_id: cli.process_id.clone(),
        job_id: cli.job_id.clone(),
        limit: cli.limit,
        process_inputs: cli.process_inputs.clone(),
        mode: cli.mode,
    };
    let value = dispatch(&client, function, &request)?;

    let out = if cli.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{}", out);
    Ok(())
}

/// `ogc-processes get_conformance` names a function, not a base URL.
fn split_positionals(base_url: Option<String>, function: Option<String>) -> (Option<String>, String) {
    match (base_url, function) {
        (Some(first), None) if !first.contains("://") && first.parse::<Function>().is_ok() => {
            (None, first)
        }
        (base_url, function) => (
            base_url,
            function.unwrap_or_else(|| Function::ProcessList.name().to_string()),
        ),
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // RUST_LOG, when set, overrides the -v flags.
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
