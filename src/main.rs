mod app;
mod catalog;
mod config;
mod display;
mod game;
mod input;
mod install;
mod lifecycle;
mod nav;
mod platform;
mod task;
mod version;
mod watchdog;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::LauncherApp;
use crate::catalog::CatalogStore;
use crate::config::{Config, Paths};
use crate::display::TracingDisplay;
use crate::input::{InputSampler, TICK_MS};
use crate::platform::{GilrsGamepad, SystemKeySource};

/// Kiosk game launcher: syncs the catalog, then drives the menu from
/// gamepad input until shut down.
#[derive(Parser, Debug)]
#[command(name = "cabinet", version, about)]
struct Args {
    /// Kiosk root directory (holds Config.json and the Games directory)
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cabinet=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cabinet launcher");

    let args = Args::parse();
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("Invalid root directory {:?}", args.root))?;

    // No config or no catalog means no usable launcher; both are fatal.
    let config = Config::load(&root)?;
    let paths = Paths::prepare(&root)?;

    let http = catalog::build_http_client().context("Failed to build HTTP client")?;
    let store = CatalogStore::sync(
        http.clone(),
        &paths.games_root,
        &paths.catalog,
        &config.game_database_url,
    )
    .await
    .context("Startup catalog synchronization failed")?;

    let gamepad = GilrsGamepad::open().context("Gamepad setup failed")?;

    let mut launcher = LauncherApp::new(
        http,
        paths.games_root.clone(),
        store,
        InputSampler::new(Box::new(gamepad)),
        Box::new(SystemKeySource),
        Box::new(TracingDisplay),
    );

    // Bring every entry up to date before the menu goes live.
    launcher.startup_sync().await;

    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS as u64));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => launcher.tick(),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}
