//! dirsync - keeps the directory in line with HR and runs approval orders.
//!
//! Each subcommand is one unit of work, meant to be driven by a scheduler
//! (reconcile, expiry-sweep) or by the approval workflow's callback
//! (process-order).

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

mod bootstrap;
mod config;
mod error;
mod logging;

use bootstrap::Runtime;
use config::{AppConfig, DEFAULT_CONFIG_PATH};
use error::{AppError, AppResult};

/// Directory synchronization runner
#[derive(Parser)]
#[command(name = "dirsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, env = "DIRSYNC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the directory against the HR snapshot and send the digest
    Reconcile,

    /// Send expiration reminders for accounts inside the configured window
    ExpirySweep,

    /// Run one approval order through the state machine
    ProcessOrder {
        /// Order identifier from the approval workflow
        order_id: String,
    },

    /// Load and validate the configuration without connecting anywhere
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!(error = %e, "dirsync failed");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = AppConfig::load(&cli.config)?;
    logging::init_logging(&config.log_filter).map_err(AppError::Logging)?;
    info!(config = %cli.config.display(), "Configuration loaded");

    if let Commands::CheckConfig = cli.command {
        let ctx = bootstrap::context(&config)?;
        return print_json(&json!({
            "base_dn": ctx.base_dn(),
            "disabled_dn": ctx.disabled_dn(),
            "default_ou": ctx.default_ou(),
            "partner_root_dn": ctx.partner_root_dn(),
            "concurrency": ctx.concurrency(),
            "order_templates": ctx.settings().order_templates.len(),
            "platforms": ctx.settings().platforms.iter().map(|p| &p.name).collect::<Vec<_>>(),
        }));
    }

    let runtime = Runtime::connect(config).await?;
    let result = execute(&runtime, cli.command).await;
    runtime.shutdown().await;
    result
}

async fn execute(runtime: &Runtime, command: Commands) -> AppResult<()> {
    match command {
        Commands::Reconcile => {
            let snapshot = runtime.hr.fetch_snapshot().await?;
            let run = runtime.reconciler().run(snapshot, Utc::now()).await?;
            print_json(&run)
        }
        Commands::ExpirySweep => {
            let report = runtime.expiry_sweep().run(Utc::now()).await?;
            print_json(&report)
        }
        Commands::ProcessOrder { order_id } => {
            let outcome = runtime.order_processor()?.process(&order_id).await?;
            print_json(&json!({ "order_id": order_id, "result": outcome }))
        }
        Commands::CheckConfig => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
