use anyhow::Result;
use clap::{Args, Subcommand};
use mrfill_autofill::{ConfigStore, JsonFileStore};
use tracing::info;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current settings as JSON
    Get,
    /// Change settings; unspecified fields keep their value
    Set(SetArgs),
    /// Print the config file location
    Path,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Enable or disable filling
    #[arg(long)]
    pub enabled: Option<bool>,

    /// Assignee username; an empty string clears it
    #[arg(long)]
    pub assignee: Option<String>,

    /// Reviewer username, repeatable; providing any replaces the list
    #[arg(long = "reviewer")]
    pub reviewers: Vec<String>,

    /// Label name, repeatable; providing any replaces the list
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Empty the reviewer list
    #[arg(long, conflicts_with = "reviewers")]
    pub clear_reviewers: bool,

    /// Empty the label list
    #[arg(long, conflicts_with = "labels")]
    pub clear_labels: bool,
}

pub async fn cmd_config(args: ConfigArgs, store: JsonFileStore) -> Result<()> {
    match args.action {
        ConfigAction::Get => {
            let config = store.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set(set) => {
            let mut config = store.load()?;
            if let Some(enabled) = set.enabled {
                config.enabled = enabled;
            }
            if let Some(assignee) = set.assignee {
                config.assignee = assignee;
            }
            if !set.reviewers.is_empty() {
                config.reviewers = set.reviewers;
            } else if set.clear_reviewers {
                config.reviewers.clear();
            }
            if !set.labels.is_empty() {
                config.labels = set.labels;
            } else if set.clear_labels {
                config.labels.clear();
            }
            store.save(&config)?;
            info!(path = %store.path().display(), "settings saved");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}
