use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings_from, DEFAULT_SETTINGS_FILE},
    OptimisticItemStore, SyncPolicy,
};
use shared::domain::{Item, ItemId};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Create, list and complete to-do items")]
struct Args {
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    policy: Option<SyncPolicy>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every item.
    List,
    /// Create an item; both fields must be non-empty.
    Add { name: String, description: String },
    /// Flip an item between pending and complete.
    Toggle { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut settings, diagnostics) = load_settings_from(&args.config);
    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(policy) = args.policy {
        settings.sync_policy = policy;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    for diagnostic in &diagnostics {
        warn!("{diagnostic}");
    }
    debug!(endpoint = %settings.endpoint, policy = %settings.sync_policy, "todo: starting");

    let store = OptimisticItemStore::from_settings(&settings)
        .context("failed to set up the item store")?;
    store.load().await?;

    match args.command {
        Command::List => {}
        Command::Add { name, description } => {
            if store.create(&name, &description).await?.is_none() {
                eprintln!("Nothing created: name and description are both required.");
            }
        }
        Command::Toggle { id } => {
            store.toggle(&ItemId::new(id)).await?;
        }
    }

    for line in render_items(&store.snapshot().await) {
        println!("{line}");
    }
    Ok(())
}

fn render_items(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let mark = if item.completed { 'x' } else { ' ' };
            let id = item
                .id
                .as_ref()
                .map(ItemId::as_str)
                .unwrap_or("pending");
            format!("[{mark}] {} - {} ({id})", item.name, item.description)
        })
        .collect()
}
