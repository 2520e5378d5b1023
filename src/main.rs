// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

mod api;
mod config;
mod report;
mod store;
mod ui;
mod validation;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
#[command(version, about = "Hospital diet management client")]
struct Args {
    /// Base URL of the dietary REST API
    #[arg(long, env = "DIET_MANAGER_BACKEND_URL", default_value = config::DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Where the persisted filter and notification state is kept
    #[arg(long, env = "DIET_MANAGER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    commands: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the spreadsheet export of the given day in the browser
    Export { date: chrono::NaiveDate },
    Run,
}

fn run(conn: api::Connection, storage: store::LocalStorage) -> Result<()> {
    let native_options = eframe::NativeOptions {
        window_builder: Some(Box::new(|mut b: egui::viewport::ViewportBuilder| {
            b.maximized = Some(true);
            b
        })),
        ..Default::default()
    };
    eframe::run_native(
        "Diet Manager",
        native_options,
        Box::new(|_cc| Ok(Box::new(ui::DietManager::new(conn, storage)))),
    )
    .map_err(|e| e.to_string())?;

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()?;

    let config = config::Config::new(&args.backend_url, args.data_dir)?;
    log::info!(
        "using backend {} with data in {}",
        config.backend_url,
        config.data_dir.display()
    );

    let conn = api::Connection::new(&config.backend_url)?;
    let storage = store::LocalStorage::new(&config.data_dir);
    match args.commands.unwrap_or(Commands::Run) {
        Commands::Export { date } => ui::export_spreadsheet(&conn, date)?,
        Commands::Run => run(conn, storage)?,
    }
    Ok(())
}
