mod challenge;
mod cli;
mod config;
mod db;
mod models;
mod practice;
mod server;
mod tui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;
use db::Database;

fn main() -> Result<()> {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_path()?,
    };

    let command = match cli.command {
        Some(Commands::Init { force }) => return handlers::handle_init(&config_path, force),
        other => other,
    };

    let config = AppConfig::load_from(&config_path).context("Loading config")?;

    // Ensure data directory exists and open DB; migrations run on every open
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    match command {
        Some(Commands::Serve { bind }) => handlers::handle_serve(db, config, bind)?,
        Some(Commands::Status) => handlers::handle_status(&db, &config)?,
        Some(Commands::Progress { sap_id }) => handlers::handle_progress(&db, &config, &sap_id)?,
        Some(Commands::Toggle { sap_id, day, yes }) => handlers::handle_toggle(&db, &sap_id, day, yes)?,
        Some(Commands::Search { sap_id }) => handlers::handle_search(&db, &config, &sap_id)?,
        Some(Commands::Calendar { sap_id, practice }) => {
            handlers::handle_calendar(&db, &config, &sap_id, practice)?
        }
        Some(Commands::Dataset) => handlers::handle_dataset(&config)?,
        Some(Commands::Init { .. }) => {}

        // No subcommand → launch the dashboard
        None => handlers::handle_dashboard(db, &config, cli.student.as_deref())?,
    }

    Ok(())
}
