//! Streaming package download into the staging area.

use std::path::{Path, PathBuf};

use apkg_schema::{CatalogEntry, PackageName, RepoUrl, Version};
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::{Layout, Reporter};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetch one package archive from its owning repository into `staged/`.
///
/// Returns the local archive path.
pub async fn stage<R: Reporter + ?Sized>(
    client: &Client,
    entry: &CatalogEntry,
    owner: &RepoUrl,
    layout: &Layout,
    reporter: &R,
) -> Result<PathBuf, DownloadError> {
    let url = owner.file_url(&entry.filename);
    let dest = layout.staged_archive(&entry.filename);
    download(client, &url, &dest, &entry.name, &entry.version, reporter).await?;
    Ok(dest)
}

/// Stream `url` to `dest`. A partially written file is removed on failure.
///
/// Returns the number of bytes written.
pub async fn download<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    dest: &Path,
    name: &PackageName,
    version: &Version,
    reporter: &R,
) -> Result<u64, DownloadError> {
    tracing::debug!(%url, dest = %dest.display(), "downloading");

    let result = stream_to_file(client, url, dest, name, version, reporter).await;
    if result.is_err() {
        tokio::fs::remove_file(dest).await.ok();
    }
    result
}

async fn stream_to_file<R: Reporter + ?Sized>(
    client: &Client,
    url: &str,
    dest: &Path,
    name: &PackageName,
    version: &Version,
    reporter: &R,
) -> Result<u64, DownloadError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total = response.content_length();
    reporter.downloading(name, version, 0, total);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(name, version, downloaded, total);
    }

    file.flush().await?;
    Ok(downloaded)
}
