//! Per-game metadata documents and process launch.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use crate::version::Version;

/// File name of the per-game metadata document inside an install directory.
pub const GAME_INFO_FILE: &str = "GameInfo.json";

/// Border/text colour used for tags that don't declare one.
pub const DEFAULT_TAG_COLOUR: &str = "#FF777777";

/// A display tag attached to a game ("2 Player", "Puzzle", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTag {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Colour", default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

impl GameTag {
    /// The declared colour, or the default grey when absent or empty.
    pub fn colour_or_default(&self) -> &str {
        match self.colour.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => DEFAULT_TAG_COLOUR,
        }
    }
}

/// One game's metadata document, re-fetched from the remote on every update
/// check and persisted next to the installed files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    #[serde(rename = "GameName")]
    pub name: String,
    #[serde(rename = "GameVersion", default)]
    pub version: Version,
    #[serde(rename = "GameAuthors", default)]
    pub authors: Vec<String>,
    #[serde(rename = "GameDescription", default)]
    pub description: String,
    #[serde(rename = "NameOfExecutable")]
    pub executable: String,
    #[serde(rename = "GameThumbnail", default)]
    pub thumbnail: String,
    #[serde(rename = "GameTags", default)]
    pub tags: Vec<GameTag>,
    #[serde(rename = "LinkToGameZip")]
    pub zip_url: String,
    #[serde(rename = "FolderName")]
    pub folder_name: String,
}

impl GameInfo {
    /// "author, author, author" for the detail panel.
    pub fn authors_line(&self) -> String {
        self.authors.join(", ")
    }

    /// Absolute path of this game's executable under the games root.
    pub fn executable_path(&self, games_root: &Path) -> PathBuf {
        games_root.join(&self.folder_name).join(&self.executable)
    }
}

/// Path of the local metadata document for an install folder.
pub fn local_info_path(games_root: &Path, folder_name: &str) -> PathBuf {
    games_root.join(folder_name).join(GAME_INFO_FILE)
}

/// Read a local metadata document. `Ok(None)` when the file doesn't exist;
/// a present-but-corrupt document is an error the caller folds into its
/// "needs install" path.
pub fn read_local_info(path: &Path) -> Result<Option<GameInfo>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let info = serde_json::from_str(&content)
        .with_context(|| format!("Malformed game metadata in {}", path.display()))?;
    Ok(Some(info))
}

/// Persist a metadata document next to the installed game. Writes through a
/// temp file and renames so a crash never leaves a truncated document.
pub fn write_local_info(games_root: &Path, info: &GameInfo) -> Result<()> {
    let dir = games_root.join(&info.folder_name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(GAME_INFO_FILE);
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .context("Failed to create temporary metadata file")?;
    tmp.write_all(serde_json::to_string_pretty(info)?.as_bytes())?;
    tmp.persist(&path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;

    tracing::debug!("Wrote game metadata to {}", path.display());
    Ok(())
}

/// Spawn a game process with its install directory as the working directory.
pub fn launch(games_root: &Path, info: &GameInfo) -> Result<Child> {
    let executable = info.executable_path(games_root);
    let working_dir = executable
        .parent()
        .context("Executable has no parent directory")?;

    tracing::info!(
        "Launching {}: {:?} with working dir {:?}",
        info.name,
        executable,
        working_dir
    );

    let child = Command::new(&executable)
        .current_dir(working_dir)
        .spawn()
        .with_context(|| format!("Failed to launch {}", executable.display()))?;

    Ok(child)
}
