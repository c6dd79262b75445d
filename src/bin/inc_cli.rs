use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use inc_manager::{
    config,
    db,
    events::{self, EventSender},
    inspection::{self, parse_line, ReceivingRecord},
    migrator,
    services::{incs::IncService, photo_storage::PhotoStorage},
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing(if cli.verbose { "debug" } else { "warn" }, false);

    match cli.command {
        Commands::Extract(args) => handle_extract(args, cli.json)?,
        Commands::Migrate(args) => handle_migrate(args).await?,
        Commands::Expired(args) => handle_expired(args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "inc-cli", about = "Receiving list and INC maintenance tools", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a receiving list and print its records
    Extract(ExtractArgs),
    /// Apply pending database migrations
    Migrate(MigrateArgs),
    /// List INCs whose supplier response deadline has passed
    Expired(ExpiredArgs),
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Path to the `.lst` file
    file: PathBuf,
    /// Also print every skipped line with its reason
    #[arg(long, action = ArgAction::SetTrue)]
    show_skipped: bool,
}

#[derive(clap::Args)]
struct MigrateArgs {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(clap::Args)]
struct ExpiredArgs {
    /// Reference date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Serialize)]
struct ExtractOutput<'a> {
    report: &'a inspection::ExtractionReport,
    records: &'a [ReceivingRecord],
}

fn handle_extract(args: ExtractArgs, json: bool) -> Result<()> {
    let raw = fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let (records, report) = inspection::extract_with_report(&raw);
    debug!(records = records.len(), encoding = %report.encoding, "extracted");

    if json {
        return print_json(&ExtractOutput {
            report: &report,
            records: &records,
        });
    }

    println!(
        "{}: {} records from {} lines ({})",
        args.file.display(),
        report.records,
        report.lines_seen,
        report.encoding
    );
    for (notice, indices) in inspection::notice_groups(&records) {
        println!("AR {}", notice);
        for index in indices {
            let r = &records[index];
            println!(
                "  {:<10} {:<12} {:>10} PO {:<8} {}  [{}]",
                r.entry_date, r.item_code, r.quantity_received, r.purchase_order, r.description, r.supplier_raw
            );
        }
    }
    for (reason, count) in &report.skipped {
        println!("skipped {:>5}  {}", count, reason);
    }

    if args.show_skipped {
        let text = String::from_utf8_lossy(&raw);
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if let Err(reason) = parse_line(line) {
                println!("{:>6}: {} | {}", number + 1, reason, line.trim_end());
            }
        }
    }
    Ok(())
}

async fn handle_migrate(args: MigrateArgs) -> Result<()> {
    let database_url = match args.database_url {
        Some(url) => url,
        None => config::load_config()?.database_url,
    };
    migrator::run_migration(&database_url).await?;
    println!("Migrations applied");
    Ok(())
}

async fn handle_expired(args: ExpiredArgs, json: bool) -> Result<()> {
    let cfg = config::load_config()?;
    let pool = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?,
    );
    let (tx, rx) = mpsc::channel(cfg.event_channel_capacity);
    tokio::spawn(events::process_events(rx));
    let service = IncService::new(
        pool,
        Arc::new(EventSender::new(tx)),
        PhotoStorage::new(cfg.upload_path()),
    );

    let today = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let expired = service.expired(today).await?;

    if json {
        let rows: Vec<_> = expired
            .iter()
            .map(|e| {
                serde_json::json!({
                    "sequence_number": e.inc.sequence_number,
                    "supplier": e.inc.supplier,
                    "item": e.inc.item,
                    "expiration_date": e.expiration_date,
                    "days_overdue": e.days_overdue,
                })
            })
            .collect();
        return print_json(&rows);
    }

    if expired.is_empty() {
        println!("No overdue INCs as of {}", today);
    }
    for e in &expired {
        println!(
            "OC {:>5}  {:<30} {:<10} due {}  {} days overdue",
            e.inc.sequence_number, e.inc.supplier, e.inc.item, e.expiration_date, e.days_overdue
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
