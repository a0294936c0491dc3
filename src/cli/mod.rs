use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mrfill_autofill::JsonFileStore;

pub mod config;
pub mod fill;
pub mod run;
pub mod runtime;
pub mod status;

#[derive(Parser, Debug)]
#[command(name = "mrfill", version, about = "Autofill GitLab merge-request forms")]
pub struct App {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch a browser tab and fill the form whenever it appears
    Run(run::RunArgs),
    /// Run one forced fill pass and exit
    Fill(fill::FillArgs),
    /// Read or change the saved fill settings
    Config(config::ConfigArgs),
    /// Print the report of the most recent fill pass
    Status,
}

pub async fn dispatch(app: App) -> Result<()> {
    let store = config_store(&app);
    match app.command {
        Command::Run(args) => run::cmd_run(args, store).await,
        Command::Fill(args) => fill::cmd_fill(args, store).await,
        Command::Config(args) => config::cmd_config(args, store).await,
        Command::Status => status::cmd_status(store),
    }
}

fn config_store(app: &App) -> JsonFileStore {
    match &app.config {
        Some(path) => JsonFileStore::new(path.clone()),
        None => JsonFileStore::new(JsonFileStore::default_path()),
    }
}
