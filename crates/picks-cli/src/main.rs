use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use picks_storage::PgPickStore;
use picks_sync::{maybe_build_scheduler, open_store, Pipeline, SyncConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "picks-cli")]
#[command(about = "Consensus picks pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the pipeline once and print the run statistics.
    Run,
    /// Serve the trigger and read endpoints (plus the scheduler when enabled).
    Serve,
    /// Run the pipeline on the configured cron until interrupted.
    Schedule,
    /// Apply Postgres migrations.
    Migrate,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("PICKS_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn build_pipeline(config: &SyncConfig) -> Result<Arc<Pipeline>> {
    let store = open_store(config).await?;
    Ok(Arc::new(Pipeline::from_config(config, store).await?))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut config = SyncConfig::from_env();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let pipeline = build_pipeline(&config).await?;
            let summary = pipeline.run_once().await?;
            let stats = &summary.stats;
            println!(
                "run complete: run_id={} raw={} filtered={} scored={} new={} duration_ms={}",
                summary.run_id,
                stats.raw_picks_found,
                stats.after_filtering,
                stats.after_scoring,
                stats.new_picks_added,
                stats.duration_ms
            );
            for pick in &summary.top_picks {
                println!(
                    "  {:<24} {} sources  {:.0}%  ({})",
                    pick.adjusted_pick,
                    pick.consensus_strength,
                    pick.confidence_score * 100.0,
                    pick.sport
                );
            }
        }
        Commands::Serve => {
            let port: u16 = std::env::var("PICKS_WEB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000);
            let pipeline = build_pipeline(&config).await?;
            let scheduler = maybe_build_scheduler(&config, Arc::clone(&pipeline)).await?;
            if let Some(sched) = &scheduler {
                sched.start().await.context("starting scheduler")?;
            }
            picks_web::serve(picks_web::AppState::new(pipeline), port).await?;
        }
        Commands::Schedule => {
            config.scheduler_enabled = true;
            let pipeline = build_pipeline(&config).await?;
            let Some(mut sched) = maybe_build_scheduler(&config, pipeline).await? else {
                return Ok(());
            };
            sched.start().await.context("starting scheduler")?;
            info!(cron = %config.sync_cron, "scheduler running; ctrl-c to stop");
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            sched.shutdown().await.context("stopping scheduler")?;
        }
        Commands::Migrate => {
            let store = PgPickStore::connect(&config.database_url)
                .await
                .context("connecting to postgres")?;
            store.migrate().await.context("running migrations")?;
            println!("migrations applied");
        }
    }

    Ok(())
}
