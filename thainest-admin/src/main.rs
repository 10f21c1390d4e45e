//! thainest-admin: command-line console for the Thainest site content
//!
//! Loads, edits and saves the site's content sections through the content
//! API, uploads SVG assets and prints status banners as operations run.

mod cli;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error};

use cli::{Commands, StdinConfirm};
use config::ConsoleConfig;
use thainest_content::{AdminConsole, HttpStore, Locale, WritePolicy};

#[derive(Parser)]
#[command(name = "thainest-admin")]
#[command(about = "Edit Thainest site content from the command line")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "thainest-admin.toml")]
    config: PathBuf,

    /// Content API base URL (overrides config file)
    #[arg(long, env = "THAINEST_API_URL")]
    api_url: Option<String>,

    /// Public asset base URL (overrides config file)
    #[arg(long, env = "THAINEST_ASSET_URL")]
    asset_url: Option<String>,

    /// Message language: th or en (overrides config file)
    #[arg(long, env = "THAINEST_LOCALE")]
    locale: Option<Locale>,

    /// Overlapping writes: queue or reject (overrides config file)
    #[arg(long)]
    write_policy: Option<WritePolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thainest_admin=info".parse()?)
                .add_directive("thainest_content=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ConsoleConfig::load(&cli.config)?;

    // Apply CLI overrides
    if let Some(api_url) = cli.api_url {
        config.api.base_url = api_url;
    }
    if let Some(asset_url) = cli.asset_url {
        config.assets.base_url = asset_url;
    }
    if let Some(locale) = cli.locale {
        config.display.locale = locale;
    }
    if let Some(policy) = cli.write_policy {
        config.api.write_policy = policy;
    }

    debug!("Content API: {}", config.api.base_url);

    let store = HttpStore::new(config.store_config())?;
    let console = Arc::new(AdminConsole::new(Arc::new(store), config.settings()));

    let mut events = console.subscribe();
    let mut run = cli::spawn_command(console.clone(), cli.command, Arc::new(StdinConfirm));

    let result = loop {
        tokio::select! {
            joined = &mut run => break joined.unwrap_or_else(|e| Err(e.into())),
            Ok(update) = events.recv() => {
                if let Some(line) = cli::format_update(&update) {
                    eprintln!("{line}");
                }
            }
        }
    };
    while let Ok(update) = events.try_recv() {
        if let Some(line) = cli::format_update(&update) {
            eprintln!("{line}");
        }
    }

    match result {
        Ok(output) => {
            println!("{}", output.trim_end());
            Ok(())
        }
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}
