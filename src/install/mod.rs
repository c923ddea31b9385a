//! Turning a remote metadata document into an installed, playable game.
//!
//! This module handles:
//! - Streaming the game archive to disk
//! - Extracting it into the per-game install directory
//! - Resolving which catalog entry a finished download belongs to
//!
//! Install and update are the same operation; only the lifecycle label the
//! app shows differs. The whole flow runs off the tick loop as a background
//! task; the outcome is applied to catalog state back on the interactive
//! context.

mod download;
mod extract;

pub use download::download_archive;
pub use extract::extract_archive;

use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

use crate::game::GameInfo;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("download failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("install IO failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("install task panicked: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The finished archive matched no catalog entry. Reported but scoped:
    /// only this install is abandoned.
    #[error("downloaded game not found in catalog")]
    GameNotFound,
}

/// Everything a background install task needs, captured up front so it
/// never borrows catalog state across the task boundary.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Remote metadata for the game being installed.
    pub info: GameInfo,
    /// Snapshot of every catalog entry's metadata URL, in catalog order,
    /// for post-download entry resolution.
    pub candidate_info_urls: Vec<String>,
}

/// Result of a completed install, applied on the interactive context.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    /// Catalog entry the archive was resolved to.
    pub entry_index: usize,
    /// The metadata document that now describes the installed game.
    pub info: GameInfo,
}

/// Download, extract and resolve one game.
///
/// The archive lands at `<games_root>/<FolderName>.zip`, is unpacked into
/// `<games_root>/<FolderName>/` and then deleted. Entry resolution re-derives
/// each candidate's metadata and matches archive URLs rather than carrying
/// an index through, so a catalog re-ordered between check and completion
/// still resolves correctly.
pub async fn install_game(
    client: reqwest::Client,
    games_root: PathBuf,
    request: InstallRequest,
) -> Result<InstallOutcome, InstallError> {
    let zip_path = games_root.join(format!("{}.zip", request.info.folder_name));
    download_archive(&client, &request.info.zip_url, &zip_path).await?;

    let install_dir = games_root.join(&request.info.folder_name);
    let file_count = extract_archive(&zip_path, &install_dir).await?;
    tokio::fs::remove_file(&zip_path).await?;
    tracing::info!(
        "Extracted {} files into {}",
        file_count,
        install_dir.display()
    );

    let fetch = |url: String| {
        let client = client.clone();
        async move {
            client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .json::<GameInfo>()
                .await
        }
    };

    let entry_index = resolve_entry(fetch, &request.candidate_info_urls, &request.info.zip_url)
        .await?
        .ok_or(InstallError::GameNotFound)?;

    Ok(InstallOutcome {
        entry_index,
        info: request.info,
    })
}

/// Find the catalog entry whose metadata document points at `zip_url`.
///
/// `fetch` is passed in as a capability so resolution is testable without a
/// network; candidates are checked in catalog order and the first match
/// wins. A fetch failure aborts resolution (and with it the install).
pub async fn resolve_entry<F, Fut, E>(
    fetch: F,
    candidates: &[String],
    zip_url: &str,
) -> Result<Option<usize>, E>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<GameInfo, E>>,
{
    for (index, info_url) in candidates.iter().enumerate() {
        let info = fetch(info_url.clone()).await?;
        if info.zip_url == zip_url {
            return Ok(Some(index));
        }
    }
    Ok(None)
}
