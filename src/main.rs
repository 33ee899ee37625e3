use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;

use shopfloor_migrate::config::AppConfig;
use shopfloor_migrate::db;
use shopfloor_migrate::etl::source::SourceData;
use shopfloor_migrate::logging;
use shopfloor_migrate::migrate::runner::Runner;
use shopfloor_migrate::migrate::{steps, StepContext};

#[derive(Parser)]
#[command(
    name = "shopfloor-migrate",
    about = "Normalizes the legacy job-shop order store into the relational schema",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply all pending migration steps, in order.
    Up,
    /// Undo the most recently applied step (refused for irreversible steps).
    Down,
    /// Show applied and pending steps.
    Status,
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("loading configuration")?;
    logging::init_tracing(&config.log_level);

    let connection = db::establish_connection(&config.database_url)
        .await
        .context("connecting to database")?;

    let source = SourceData::load(
        config.legacy_orders_path.as_deref(),
        config.assembly_rows_path.as_deref(),
        config.scan_feed_path.as_deref(),
    )
    .context("loading source feeds")?;

    let ctx = StepContext::new(connection, source);
    let runner = Runner::new(ctx, steps::default_steps());

    match cli.command {
        Command::Up => {
            let ran = runner.apply_pending().await?;
            if ran.is_empty() {
                println!("Nothing to apply; all steps recorded in the ledger.");
            } else {
                for name in ran {
                    println!("applied  {name}");
                }
            }
        }
        Command::Down => {
            let name = runner.undo_last().await?;
            println!("undone   {name}");
        }
        Command::Status => {
            let report = runner.status().await?;
            for step in &report.applied {
                println!(
                    "applied  {}  at {}",
                    step.name,
                    step.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            for name in &report.pending {
                println!("pending  {name}");
            }
            if report.applied.is_empty() && report.pending.is_empty() {
                println!("No migration steps discovered.");
            }
        }
    }

    Ok(())
}
