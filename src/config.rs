//! Kiosk configuration and derived paths.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of the startup configuration document at the kiosk root.
pub const CONFIG_FILE: &str = "Config.json";

/// Directory under the kiosk root that holds installed games and the local
/// catalog document.
pub const GAMES_DIR: &str = "Games";

/// File name of the local catalog document inside the games directory.
pub const CATALOG_FILE: &str = "GameDatabase.json";

/// Startup configuration. The config document is read once; a kiosk without
/// one has no catalog to sync against and cannot start.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "GameDatabaseURL")]
    pub game_database_url: String,
}

impl Config {
    /// Load `Config.json` from the kiosk root. Absence is fatal.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config document {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Malformed config document {}", path.display()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Filesystem layout rooted at the kiosk directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub games_root: PathBuf,
    pub catalog: PathBuf,
}

impl Paths {
    /// Derive the layout and create the games directory if missing.
    pub fn prepare(root: &Path) -> Result<Self> {
        let games_root = root.join(GAMES_DIR);
        std::fs::create_dir_all(&games_root)
            .with_context(|| format!("Failed to create games directory {}", games_root.display()))?;

        Ok(Self {
            catalog: games_root.join(CATALOG_FILE),
            games_root,
        })
    }
}
