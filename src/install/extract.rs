//! Archive extraction into a game's install directory.

use std::path::Path;

use super::InstallError;

/// Extract a ZIP archive wholesale into `destination`, replacing whatever
/// was installed there before. Returns the number of entries extracted.
///
/// An update otherwise leaves files the new release deleted lying around,
/// so an existing install directory is removed first.
pub async fn extract_archive(zip_path: &Path, destination: &Path) -> Result<usize, InstallError> {
    if destination.exists() {
        let stale = destination.to_path_buf();
        tokio::task::spawn_blocking(move || remove_dir_all::remove_dir_all(&stale)).await??;
        tracing::debug!("Removed previous install at {}", destination.display());
    }

    let zip_path = zip_path.to_path_buf();
    let destination = destination.to_path_buf();

    // ZIP extraction is blocking, run it off the runtime threads.
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let total = archive.len();
        for i in 0..total {
            let mut entry = archive.by_index(i)?;

            // Skip entries that would escape the destination.
            let outpath = match entry.enclosed_name() {
                Some(path) => destination.join(path),
                None => continue,
            };

            if entry.name().ends_with('/') {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    if !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let mut outfile = std::fs::File::create(&outpath)?;
                std::io::copy(&mut entry, &mut outfile)?;
            }
        }

        Ok::<_, InstallError>(total)
    })
    .await?
}
