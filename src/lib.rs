pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::providers::bank_lv::BankLvFetcher;
use crate::store::SqliteRateStore;
use anyhow::{Context, Result};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Sync,
    Latest { code: String, json: bool },
    History { code: String, json: bool },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

pub async fn open_store(config: &AppConfig) -> Result<SqliteRateStore> {
    let db_path = config.database_path()?;
    debug!("Opening rate database at {}", db_path.display());
    let store = SqliteRateStore::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    store
        .migrate()
        .await
        .context("Failed to migrate database")?;
    Ok(store)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxsync starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let store = open_store(&config).await?;

    match command {
        AppCommand::Sync => {
            let fetcher = BankLvFetcher::new(&config.feed.url, config.feed.timeout())
                .context("Failed to create feed client")?;
            cli::sync::run(&store, &fetcher, &config).await;
        }
        AppCommand::Latest { code, json } => {
            println!("{}", cli::rates::latest_output(&store, &code, json).await?);
        }
        AppCommand::History { code, json } => {
            println!("{}", cli::rates::history_output(&store, &code, json).await?);
        }
    }

    Ok(())
}
