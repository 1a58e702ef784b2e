//! fleetcheck CLI
//!
//! Inspect an inventory, resolve selectors and run RISU diagnostics across
//! the selected hosts.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use eyre::WrapErr;
use serde::Serialize;
use tracing::{info, warn};

use fleetcheck_api::{
    DiagnosticsRequest, DiagnosticsResponse, HostVarsView, InventoryView, LooseValue,
    ResolvedHostsView,
};
use fleetcheck_core::{DiagnosticsRunner, Settings};
use fleetcheck_diag::{DiagnosticsRun, EventCollector, ExecutionSummary, RunStatus, RunnerEvent};

mod telemetry;

#[derive(Parser)]
#[command(name = "fleetcheck")]
#[command(about = "Run RISU diagnostics across an Ansible inventory", long_about = None)]
struct Cli {
    /// Settings file (overrides discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inventory file (overrides settings)
    #[arg(long, short, global = true)]
    inventory: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the inventory with sensitive variables removed
    Inventory,

    /// Expand a selector into hosts
    Resolve {
        /// Selector such as `web:!web3` or `db*`
        selector: String,
    },

    /// Show the effective variables of a host
    Vars {
        host: String,
    },

    /// Run diagnostics
    Run {
        /// Hosts to diagnose
        #[arg(default_value = "localhost")]
        selector: String,

        /// Only run RISU plugins matching this filter
        #[arg(long)]
        filter: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Also write the JSON report into the runner directory
        #[arg(long)]
        save: bool,
    },

    /// Build a report from a runner event log (one JSON event per line)
    Events {
        file: PathBuf,

        /// Selector the run was started with
        #[arg(long, default_value = "all")]
        selector: String,

        /// Status reported by the runner
        #[arg(long, default_value = "successful")]
        status: String,

        /// Exit code reported by the runner
        #[arg(long)]
        code: Option<i32>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    telemetry::init_tracing(cli.log_json, &settings.log_level);
    report_settings_source(&settings);

    let runner = DiagnosticsRunner::new(Arc::new(settings));

    match cli.command {
        Commands::Inventory => {
            let model = runner.load_inventory(None)?;
            print_json(&InventoryView::from_model(&model))?;
        }
        Commands::Resolve { selector } => {
            let model = runner.load_inventory(None)?;
            let view = ResolvedHostsView::from(model.resolve(&selector));
            print_json(&view)?;
            if !view.validated {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Vars { host } => {
            let model = runner.load_inventory(None)?;
            print_json(&HostVarsView::from_model(&model, &host))?;
        }
        Commands::Run {
            selector,
            filter,
            format,
            save,
        } => {
            let request = DiagnosticsRequest {
                hosts: selector,
                plugin_filter: LooseValue::from(filter),
                inventory: LooseValue::Null,
            };
            let run = runner.run(&request.to_run_request()).await?;

            if save {
                let path = save_report(&runner.settings().runner_dir(), &run)?;
                info!(path = %path.display(), "report saved");
            }
            return emit(run, format);
        }
        Commands::Events {
            file,
            selector,
            status,
            code,
            format,
        } => {
            let text = std::fs::read_to_string(&file)
                .wrap_err_with(|| format!("failed to read {}", file.display()))?;

            let mut collector = EventCollector::new();
            for event in read_events(&text) {
                collector.ingest(&event);
            }
            let run = collector.finish(&selector, ExecutionSummary::new(status, code));
            return emit(run, format);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Settings from `--config` or discovery, with `--inventory` applied last
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let mut settings = Settings::load(path)?;
            settings.apply_env(|key| std::env::var(key).ok());
            settings.resolve_paths();
            settings
        }
        None => Settings::load_default()?,
    };

    if let Some(inventory) = &cli.inventory {
        settings.paths.inventory = Some(std::path::absolute(inventory)?);
    }
    Ok(settings)
}

/// Log where the settings came from; called once tracing is up
fn report_settings_source(settings: &Settings) {
    match settings.source() {
        Some(path) => info!(path = %path.display(), "settings loaded"),
        None => warn!("no config file found, using defaults"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a run and map its status to the exit code
fn emit(run: DiagnosticsRun, format: Format) -> Result<ExitCode> {
    let failed = run.status == RunStatus::Failed;
    let response = DiagnosticsResponse::from(run);

    match format {
        Format::Json => print_json(&response)?,
        Format::Text => println!("{}", response.summary),
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Parse newline-delimited runner events, skipping lines that are not events
fn read_events(text: &str) -> Vec<RunnerEvent> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping unparseable event");
                None
            }
        })
        .collect()
}

/// Write the run as JSON into `dir`, named by the current UTC time
fn save_report(dir: &Path, run: &DiagnosticsRun) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .wrap_err_with(|| format!("failed to create {}", dir.display()))?;

    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let path = dir.join(format!("report-{stamp}.json"));
    std::fs::write(&path, serde_json::to_string_pretty(run)?)
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
