//! Archive download for game installs.

use futures::StreamExt;
use std::path::Path;
use std::time::Instant;
use tokio::io::AsyncWriteExt;

use super::InstallError;

/// Extension appended to in-flight downloads so a crashed launcher never
/// leaves something that looks like a finished archive.
const PART_EXTENSION: &str = "zip.part";

/// Download a game archive to `dest_path`.
///
/// Streams to a `.part` temporary file, then renames on success.
pub async fn download_archive(
    client: &reqwest::Client,
    url: &str,
    dest_path: &Path,
) -> Result<(), InstallError> {
    let download_start = Instant::now();

    let response = client.get(url).send().await?.error_for_status()?;

    if let Some(parent) = dest_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = dest_path.with_extension(PART_EXTENSION);
    let mut file = tokio::fs::File::create(&temp_path).await?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&temp_path, dest_path).await?;

    let elapsed = download_start.elapsed().as_secs_f32();
    tracing::info!(
        "Download complete: {:.1} MB in {:.1}s ({})",
        downloaded as f32 / 1_000_000.0,
        elapsed,
        url
    );

    Ok(())
}
