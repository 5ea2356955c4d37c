//! Catalog Client
//!
//! Fetches `APKINDEX.tar.gz` from every configured repository, pulls the
//! `APKINDEX` entry out of it and merges the parsed stanzas into one
//! [`Catalog`]. A repository that fails is skipped with a warning; only a
//! catalog that ends up empty is an error.

use std::io::{self, Read};
use std::path::Path;

use apkg_schema::{Catalog, CatalogEntry, INDEX_ARCHIVE, INDEX_ENTRY, RepoUrl, parse_index};
use flate2::read::MultiGzDecoder;
use reqwest::Client;
use thiserror::Error;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected content type {content_type:?} from {url}")]
    ContentType { url: String, content_type: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("no {INDEX_ENTRY} entry in {url}")]
    MissingIndex { url: String },

    #[error("no repository provided any packages")]
    Empty,
}

/// Content types a repository may serve its index archive with.
fn is_archive_content_type(content_type: &str) -> bool {
    content_type.contains("gzip") || content_type.contains("octet-stream")
}

/// Fetch and parse one repository's index.
pub async fn fetch_index(client: &Client, repo: &RepoUrl) -> Result<Vec<CatalogEntry>, CatalogError> {
    let url = repo.file_url(INDEX_ARCHIVE);
    tracing::debug!(%url, "fetching index");

    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !is_archive_content_type(&content_type) {
        return Err(CatalogError::ContentType { url, content_type });
    }

    let bytes = response.bytes().await?;
    let text = tokio::task::spawn_blocking(move || read_index_archive(&bytes))
        .await
        .map_err(io::Error::other)??;

    match text {
        Some(text) => Ok(parse_index(&text)),
        None => Err(CatalogError::MissingIndex { url }),
    }
}

/// Decompress an index archive and return the text of its index entry.
pub fn read_index_archive(bytes: &[u8]) -> io::Result<Option<String>> {
    let mut archive = tar::Archive::new(MultiGzDecoder::new(bytes));
    archive.set_ignore_zeros(true);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?;
        if path.strip_prefix(".").unwrap_or(&path) != Path::new(INDEX_ENTRY) {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        return Ok(Some(text));
    }

    Ok(None)
}

/// Build the merged catalog from `repos`, in order.
///
/// # Errors
///
/// Returns [`CatalogError::Empty`] if no repository contributed a package.
pub async fn fetch_catalog<R: Reporter + ?Sized>(
    client: &Client,
    repos: &[RepoUrl],
    reporter: &R,
) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::new();

    for repo in repos {
        match fetch_index(client, repo).await {
            Ok(entries) => {
                let published = entries.len();
                let claimed = catalog.merge(repo, entries);
                tracing::info!(repo = %repo, published, claimed, "merged index");
            }
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "skipping repository");
                reporter.warning(&format!("Skipping {repo}: {e}"));
            }
        }
    }

    if catalog.is_empty() {
        return Err(CatalogError::Empty);
    }
    Ok(catalog)
}
