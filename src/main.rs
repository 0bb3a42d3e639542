mod config;
mod db;
mod error;
mod fetch;
mod ocr;
mod parser;
mod recorder;
mod runner;
mod snapshot;
mod store;

use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use config::{GlobalArgs, RunArgs, Settings, HISTORY_DATASET, KV_STORE, LATEST_KEY, OUTPUT_DATASET};
use snapshot::Snapshot;
use store::LatestSlot;

#[derive(Parser)]
#[command(name = "covid_fr_tracker", about = "COVID-19 France figures from Santé publique France")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the page once, record the figures, archive them if they changed
    Run(RunArgs),
    /// Print the latest recorded snapshot
    Latest,
    /// Show archived snapshots, oldest first
    History {
        /// Only the last N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let conn = db::connect(&cli.global.db)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Run(args) => {
            let settings = Settings::from_args(args)?;
            let snapshot = runner::run(&conn, &settings).await?;
            info!("Crawler finished.");
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Commands::Latest => {
            let kv = db::SqliteKeyValueStore::open(&conn, KV_STORE);
            match LatestSlot::new(&kv, LATEST_KEY).read()? {
                Some(s) => println!("{}", serde_json::to_string_pretty(&s)?),
                None => println!("Nothing recorded yet. Run 'run' first."),
            }
            Ok(())
        }
        Commands::History { limit } => {
            let items = db::fetch_items(&conn, HISTORY_DATASET, limit)?;
            if items.is_empty() {
                println!("History is empty.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<24} | {:>9} | {:>8}",
                "#", "Captured", "Source updated", "Infected", "Deceased"
            );
            println!("{}", "-".repeat(80));
            for (i, item) in items.into_iter().enumerate() {
                match serde_json::from_value::<Snapshot>(item) {
                    Ok(s) => println!(
                        "{:>3} | {:<24} | {:<24} | {:>9} | {:>8}",
                        i + 1,
                        s.captured_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                        s.source_updated_at.format("%Y-%m-%d %Hh").to_string(),
                        s.infected,
                        s.deceased
                    ),
                    Err(e) => println!("{:>3} | unreadable entry: {}", i + 1, e),
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let kv = db::SqliteKeyValueStore::open(&conn, KV_STORE);
            let latest = LatestSlot::new(&kv, LATEST_KEY).read()?;
            println!("History:  {}", db::count_items(&conn, HISTORY_DATASET)?);
            println!("Runs:     {}", db::count_items(&conn, OUTPUT_DATASET)?);
            match latest {
                Some(s) => {
                    println!("Latest:   {}", s.captured_at.format("%Y-%m-%d %H:%M UTC"));
                    println!("Infected: {}", s.infected);
                    println!("Deceased: {}", s.deceased);
                }
                None => println!("Latest:   -"),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
