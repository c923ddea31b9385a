//! The local game catalog and its synchronization against the remote
//! database.
//!
//! The catalog document is the single source of truth for which games exist
//! and which are installed locally. `FolderName` is the only field the
//! launcher ever writes back into it; everything else passes through from
//! the remote document unchanged. Every successful mutation is persisted
//! immediately, so no catalog state lives only in memory.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::{self, GameInfo};

/// User agent for remote catalog and metadata requests.
const USER_AGENT: &str = concat!("cabinet/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog could not be obtained at all. Fatal: without a catalog
    /// there is nothing for the launcher to show.
    #[error("game catalog unavailable: {0}")]
    Unavailable(String),

    /// A per-game fetch failed. Scoped to that game; the rest of the
    /// catalog stays usable.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("catalog IO failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One catalog record: a known game plus its install pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Name shown in the title list until the game's own metadata is known.
    #[serde(rename = "DisplayName", default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    /// Install directory under the games root; empty until installed.
    #[serde(rename = "FolderName", default)]
    pub folder_name: String,

    /// Where this game's metadata document lives on the remote.
    #[serde(rename = "LinkToGameInfo")]
    pub info_url: String,

    /// Remote fields the launcher doesn't interpret but must not lose when
    /// it persists the merged catalog.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogEntry {
    pub fn is_installed(&self) -> bool {
        !self.folder_name.is_empty()
    }
}

/// The catalog document: an ordered list of entries, index-stable for the
/// lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "Games", default)]
    pub games: Vec<CatalogEntry>,
}

/// Outcome of an update check for one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision {
    UpToDate,
    NeedsInstall,
    /// Carries the freshly fetched remote metadata so the caller doesn't
    /// fetch it a second time.
    NeedsUpdate(GameInfo),
}

/// Build the shared HTTP client used for catalog, metadata and archive
/// requests.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Copy each locally recorded install pointer into the freshly fetched
/// catalog, matching by entry index only. Previously installed games keep
/// their pointer even when other remote metadata changed.
pub fn merge_installed_folders(remote: &mut Catalog, local: &Catalog) {
    for (entry, local_entry) in remote.games.iter_mut().zip(&local.games) {
        entry.folder_name = local_entry.folder_name.clone();
    }
}

/// Which remote release an entry's local install corresponds to, given the
/// already-loaded local metadata and the freshly fetched remote document.
pub fn decide(local: &GameInfo, remote: GameInfo) -> UpdateDecision {
    if remote.version.differs(&local.version) {
        UpdateDecision::NeedsUpdate(remote)
    } else {
        UpdateDecision::UpToDate
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Loads, merges and persists the catalog, and answers update checks.
pub struct CatalogStore {
    http: reqwest::Client,
    games_root: PathBuf,
    catalog_path: PathBuf,
    catalog: Catalog,
}

impl CatalogStore {
    /// Fetch the remote catalog, merge in local install pointers and persist
    /// the result. Any failure here is fatal to the session: an unreachable
    /// remote or an unreadable local document both mean there is no catalog
    /// to run against.
    pub async fn sync(
        http: reqwest::Client,
        games_root: &Path,
        catalog_path: &Path,
        remote_url: &str,
    ) -> Result<Self, CatalogError> {
        let mut remote: Catalog = http
            .get(remote_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if catalog_path.exists() {
            let local = load_catalog(catalog_path)
                .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
            merge_installed_folders(&mut remote, &local);
        }

        if remote.games.is_empty() {
            tracing::warn!("Remote catalog contains no games");
        }

        let store = Self {
            http,
            games_root: games_root.to_path_buf(),
            catalog_path: catalog_path.to_path_buf(),
            catalog: remote,
        };
        store.persist()?;

        tracing::info!(
            "Catalog synchronized: {} games, persisted to {}",
            store.catalog.games.len(),
            store.catalog_path.display()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.catalog.games.len()
    }

    pub fn entry(&self, index: usize) -> Option<&CatalogEntry> {
        self.catalog.games.get(index)
    }

    /// Snapshot of every entry's metadata URL, in catalog order. Handed to
    /// the install resolver so it can identify a finished download without
    /// borrowing the catalog from a background task.
    pub fn info_urls(&self) -> Vec<String> {
        self.catalog.games.iter().map(|e| e.info_url.clone()).collect()
    }

    /// Fetch a per-game metadata document from the remote.
    pub async fn fetch_remote_info(&self, info_url: &str) -> Result<GameInfo, CatalogError> {
        let info = self
            .http
            .get(info_url)
            .send()
            .await?
            .error_for_status()?
            .json::<GameInfo>()
            .await?;
        Ok(info)
    }

    /// Decide whether the entry at `index` is current, missing, or stale.
    ///
    /// No install pointer or no readable local metadata means NeedsInstall
    /// without touching the network. Otherwise the remote document is
    /// fetched and versions compared with `differs`; a fetch failure is a
    /// scoped network error.
    pub async fn check_for_update(&self, index: usize) -> Result<UpdateDecision, CatalogError> {
        let Some(entry) = self.entry(index) else {
            return Ok(UpdateDecision::UpToDate);
        };

        if !entry.is_installed() {
            return Ok(UpdateDecision::NeedsInstall);
        }

        let info_path = game::local_info_path(&self.games_root, &entry.folder_name);
        let local = match game::read_local_info(&info_path) {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(UpdateDecision::NeedsInstall),
            Err(e) => {
                // Corrupt metadata is treated the same as absent metadata.
                tracing::warn!(
                    "Unreadable metadata for entry {} ({}): {e:#}",
                    index,
                    entry.folder_name
                );
                return Ok(UpdateDecision::NeedsInstall);
            }
        };

        let remote = self.fetch_remote_info(&entry.info_url).await?;
        Ok(decide(&local, remote))
    }

    /// Record where a game was installed and persist the catalog at once.
    pub fn set_folder_name(&mut self, index: usize, folder_name: &str) -> Result<(), CatalogError> {
        if let Some(entry) = self.catalog.games.get_mut(index) {
            entry.folder_name = folder_name.to_string();
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), CatalogError> {
        let dir = self
            .catalog_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_string_pretty(&self.catalog)?.as_bytes())?;
        tmp.persist(&self.catalog_path)
            .map_err(|e| CatalogError::Io(e.error))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn open_for_tests(games_root: &Path, catalog_path: &Path, catalog: Catalog) -> Self {
        Self {
            http: build_http_client().unwrap(),
            games_root: games_root.to_path_buf(),
            catalog_path: catalog_path.to_path_buf(),
            catalog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;
    use tempfile::TempDir;

    fn entry(info_url: &str, folder_name: &str) -> CatalogEntry {
        CatalogEntry {
            display_name: String::new(),
            folder_name: folder_name.to_string(),
            info_url: info_url.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    fn info(folder: &str, version: &str, zip_url: &str) -> GameInfo {
        GameInfo {
            name: folder.to_string(),
            version: Version::parse(version),
            authors: Vec::new(),
            description: String::new(),
            executable: "game.exe".to_string(),
            thumbnail: String::new(),
            tags: Vec::new(),
            zip_url: zip_url.to_string(),
            folder_name: folder.to_string(),
        }
    }

    #[test]
    fn merge_keeps_install_pointers_by_index() {
        let mut remote = Catalog {
            games: vec![
                entry("https://example.com/a.json", ""),
                entry("https://example.com/b.json", ""),
                entry("https://example.com/c.json", ""),
            ],
        };
        let local = Catalog {
            games: vec![
                entry("https://example.com/a.json", ""),
                entry("https://example.com/b.json", ""),
                entry("https://stale.example.com/old-c.json", "Foo"),
            ],
        };

        merge_installed_folders(&mut remote, &local);

        assert_eq!(remote.games[2].folder_name, "Foo");
        // Everything except the install pointer comes from the remote.
        assert_eq!(remote.games[2].info_url, "https://example.com/c.json");
        assert_eq!(remote.games[0].folder_name, "");
        assert_eq!(remote.games[1].folder_name, "");
    }

    #[test]
    fn merge_tolerates_length_mismatch() {
        let mut remote = Catalog {
            games: vec![
                entry("https://example.com/a.json", ""),
                entry("https://example.com/b.json", ""),
            ],
        };
        let local = Catalog {
            games: vec![entry("https://example.com/a.json", "Installed")],
        };

        merge_installed_folders(&mut remote, &local);

        assert_eq!(remote.games[0].folder_name, "Installed");
        assert_eq!(remote.games[1].folder_name, "");
    }

    #[test]
    fn uninterpreted_remote_fields_round_trip() {
        let doc = r#"{
            "Games": [
                {
                    "FolderName": "",
                    "LinkToGameInfo": "https://example.com/a.json",
                    "Featured": true,
                    "SortWeight": 4
                }
            ]
        }"#;

        let catalog: Catalog = serde_json::from_str(doc).unwrap();
        let out = serde_json::to_string(&catalog).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(reparsed["Games"][0]["Featured"], serde_json::json!(true));
        assert_eq!(reparsed["Games"][0]["SortWeight"], serde_json::json!(4));
    }

    #[test]
    fn decide_compares_with_differs() {
        let local = info("Foo", "1.0.0", "https://example.com/foo.zip");

        let same = info("Foo", "1.0.0", "https://example.com/foo.zip");
        assert_eq!(decide(&local, same), UpdateDecision::UpToDate);

        let newer = info("Foo", "1.0.1", "https://example.com/foo.zip");
        match decide(&local, newer) {
            UpdateDecision::NeedsUpdate(remote) => {
                assert_eq!(remote.version, Version::parse("1.0.1"));
            }
            other => panic!("expected NeedsUpdate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn uninstalled_entries_need_install_without_network() {
        let root = TempDir::new().unwrap();
        let games_root = root.path().join("Games");
        std::fs::create_dir_all(&games_root).unwrap();

        let catalog = Catalog {
            games: vec![
                entry("https://example.invalid/a.json", ""),
                entry("https://example.invalid/b.json", ""),
                entry("https://example.invalid/c.json", ""),
            ],
        };
        let store = CatalogStore::open_for_tests(
            &games_root,
            &games_root.join(CATALOG_TEST_FILE),
            catalog,
        );

        // The info URLs are unreachable on purpose: the missing-install path
        // must decide before any fetch.
        for i in 0..3 {
            let decision = store.check_for_update(i).await.unwrap();
            assert_eq!(decision, UpdateDecision::NeedsInstall);
        }
    }

    #[tokio::test]
    async fn corrupt_local_metadata_reads_as_needs_install() {
        let root = TempDir::new().unwrap();
        let games_root = root.path().join("Games");
        let install_dir = games_root.join("Broken");
        std::fs::create_dir_all(&install_dir).unwrap();
        std::fs::write(install_dir.join(crate::game::GAME_INFO_FILE), "{ nope").unwrap();

        let catalog = Catalog {
            games: vec![entry("https://example.invalid/broken.json", "Broken")],
        };
        let store = CatalogStore::open_for_tests(
            &games_root,
            &games_root.join(CATALOG_TEST_FILE),
            catalog,
        );

        let decision = store.check_for_update(0).await.unwrap();
        assert_eq!(decision, UpdateDecision::NeedsInstall);
    }

    #[test]
    fn set_folder_name_persists_immediately() {
        let root = TempDir::new().unwrap();
        let games_root = root.path().join("Games");
        std::fs::create_dir_all(&games_root).unwrap();
        let catalog_path = games_root.join(CATALOG_TEST_FILE);

        let catalog = Catalog {
            games: vec![entry("https://example.com/a.json", "")],
        };
        let mut store = CatalogStore::open_for_tests(&games_root, &catalog_path, catalog);

        store.set_folder_name(0, "FreshInstall").unwrap();

        let on_disk = load_catalog(&catalog_path).unwrap();
        assert_eq!(on_disk.games[0].folder_name, "FreshInstall");
    }

    const CATALOG_TEST_FILE: &str = "GameDatabase.json";
}
