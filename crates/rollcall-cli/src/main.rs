use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rollcall_core::{config, summarize, AttendanceRecorder, Config, Ledger, RecordOutcome};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance ledger CLI")]
struct Cli {
    /// Ledger directory (overrides ROLLCALL_LOG_DIR and the config file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Cooldown in seconds (overrides ROLLCALL_COOLDOWN_SECS and the config file)
    #[arg(long, global = true)]
    cooldown_secs: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one sighting of a person
    Record {
        /// Identity label, exactly as the recognizer reports it
        name: String,
    },
    /// Print a day's ledger
    Show {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Per-person row count and first/last time for a day
    Summary {
        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List days that have a ledger
    Dates,
    /// Show effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(dir) = cli.log_dir {
        config.log_dir = dir;
    }
    if let Some(secs) = cli.cooldown_secs {
        config.cooldown = config::cooldown_from_secs(secs)?;
    }

    // Only `record` may create the ledger directory.
    let ledger = Ledger::at(&config.log_dir);
    let today = || Local::now().date_naive();

    match cli.command {
        Commands::Record { name } => {
            let mut recorder =
                AttendanceRecorder::open(&config).context("failed to open attendance ledger")?;
            match recorder.record(&name) {
                RecordOutcome::Accepted(row) => {
                    println!("Recorded {} at {}", row.identity, row.timestamp());
                }
                RecordOutcome::Suppressed(reason) => {
                    println!("Not recorded: {reason}");
                }
            }
        }
        Commands::Show { date, json } => {
            let date = date.unwrap_or_else(today);
            let rows = ledger.rows(date)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No attendance recorded for {date}");
            } else {
                println!("{:<24} {:<10} STATUS", "NAME", "TIME");
                for row in &rows {
                    let status = row.status.map(|s| s.as_str()).unwrap_or("?");
                    println!("{:<24} {:<10} {status}", row.identity, row.raw_time);
                }
            }
        }
        Commands::Summary { date, json } => {
            let date = date.unwrap_or_else(today);
            let summary = summarize(&ledger.rows(date)?);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.is_empty() {
                println!("No attendance recorded for {date}");
            } else {
                println!("{:<24} {:>5} {:<10} {:<10}", "NAME", "ROWS", "FIRST", "LAST");
                for s in &summary {
                    let fmt = |t: Option<chrono::NaiveTime>| {
                        t.map(|t| t.format("%H:%M:%S").to_string())
                            .unwrap_or_else(|| "-".into())
                    };
                    println!(
                        "{:<24} {:>5} {:<10} {:<10}",
                        s.identity,
                        s.rows,
                        fmt(s.first),
                        fmt(s.last)
                    );
                }
            }
        }
        Commands::Dates => {
            let dates = ledger.dates()?;
            if dates.is_empty() {
                println!("No ledgers in {}", ledger.dir().display());
            }
            for date in dates {
                println!("{date}");
            }
        }
        Commands::Config => {
            println!("log_dir:  {}", config.log_dir.display());
            println!("cooldown: {}s", config.cooldown.num_seconds());
        }
    }

    Ok(())
}
