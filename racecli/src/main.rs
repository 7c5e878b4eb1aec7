//! Race-office command line: event setup subcommands plus the interactive
//! prompt used at the registration desk.

mod edit;
mod repl;

use anyhow::{Context, Result};
use app_core::{Core, CoreBuilder, SchedulerOptions};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use db_json::JsonDb;
use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "racecli", about = "Orienteering race management tools")]
struct Cli {
    /// event database file (JSON snapshot)
    #[arg(long, env = "ORC_DB_PATH", default_value = "race.json")]
    db: PathBuf,

    /// receipt printer device; omit to print on screen only
    #[arg(long, env = "ORC_PRINTER_DEVICE")]
    printer: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh event database
    CreateEvent {
        name: String,
        /// first competition day, YYYY-MM-DD
        date: NaiveDate,
        #[arg(long, default_value = "")]
        judge: String,
        #[arg(long, default_value = "")]
        secretary: String,
        #[arg(long, default_value = "")]
        place: String,
    },
    /// Import one stage from an IOF 3.0 course-data XML file
    ImportStage {
        file: PathBuf,
        day: u32,
        #[arg(long)]
        name: Option<String>,
    },
    /// Import the competitor list from CSV
    ImportCompetitors { file: PathBuf },
    /// Import the club list from CSV
    ImportClubs { file: PathBuf },
    /// Assign start slots for a day
    ArrangeStart {
        day: u32,
        #[arg(long, default_value_t = 1)]
        parallel: usize,
        /// fixed seed; omit to draw one (the draw is logged either way)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Export the IOF 3.0 ResultList of a day
    ExportResults {
        /// defaults to the current day
        day: Option<u32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn drawn_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn run_command(core: &Core, command: Command) -> Result<()> {
    match command {
        Command::CreateEvent {
            name,
            date,
            judge,
            secretary,
            place,
        } => {
            core.create_event(&app_core::EventSetup {
                name: name.clone(),
                start_date: date,
                judge,
                secretary,
                place,
            })
            .await?;
            println!("Created event {name}.");
        }
        Command::ImportStage { file, day, name } => {
            let xml = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let stage = iof_exchange::import_stage(core, &xml, day, name.as_deref()).await?;
            println!("Imported stage E{} (id {}).", stage.day, stage.id);
        }
        Command::ImportCompetitors { file } => {
            let reader = std::fs::File::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let report = iof_exchange::import_competitors(core, reader).await?;
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!("Imported {} competitors.", report.imported);
        }
        Command::ImportClubs { file } => {
            let reader = std::fs::File::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let report = iof_exchange::import_clubs(core, reader).await?;
            println!("Imported {} clubs.", report.imported);
        }
        Command::ArrangeStart { day, parallel, seed } => {
            let opts = SchedulerOptions::new(parallel, seed.unwrap_or_else(drawn_seed));
            let summary = core.assign_start_slots(day, &opts).await?;
            println!(
                "Assigned {} runs over {} slots (seed {}).",
                summary.assigned, summary.slots_used, summary.seed
            );
        }
        Command::ExportResults { day, output } => {
            let day = match day {
                Some(day) => day,
                None => core.current_day().await?,
            };
            let xml = iof_exchange::export_result_list(core, day, chrono::Utc::now()).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, xml)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote results of day {day} to {}.", path.display());
                }
                None => print!("{xml}"),
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let db = JsonDb::open(&cli.db)
        .with_context(|| format!("opening event database {}", cli.db.display()))?;
    let core = CoreBuilder::new().set_db(Arc::new(db)).build();

    match cli.command {
        Some(command) => run_command(&core, command).await,
        None => repl::run(&core, cli.printer.as_deref()).await,
    }
}
