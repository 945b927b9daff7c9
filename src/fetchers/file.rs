//! Fetchers backed by saved pages on disk.
//!
//! `SnapshotFetcher` saves every page it fetches and `FileFetcher` reads the
//! same files back, so a scan can be replayed offline.

use super::fetcher::{PageFetcher, non_empty_body};
use super::Page;
use crate::error::FetchError;
use crate::utils::sanitize_filename;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Returns the path of the saved copy of `url` inside `dir`
pub fn snapshot_path(dir: &Path, url: &str) -> PathBuf {
    dir.join(format!("{}.html", sanitize_filename(url)))
}

/// Reads pages from a snapshot directory instead of the network
pub struct FileFetcher {
    dir: PathBuf,
}

impl FileFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PageFetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let path = snapshot_path(&self.dir, url);
        ::log::debug!("Reading {} from {}", url, path.display());

        let body = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                FetchError::NotFound {
                    url: url.to_string(),
                }
            } else {
                FetchError::Io {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        non_empty_body(url, body)
    }
}

/// Wraps another fetcher and saves each fetched body to a directory.
///
/// A failed save is logged; the fetched page is still returned.
pub struct SnapshotFetcher<F> {
    inner: F,
    dir: PathBuf,
}

impl<F: PageFetcher> SnapshotFetcher<F> {
    pub fn new(inner: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    async fn save(&self, page: &Page) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = snapshot_path(&self.dir, &page.url);
        tokio::fs::write(&path, &page.body).await?;
        Ok(path)
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for SnapshotFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let page = self.inner.fetch(url).await?;
        match self.save(&page).await {
            Ok(path) => ::log::debug!("Saved {} to {}", url, path.display()),
            Err(e) => ::log::warn!("Failed to save snapshot of {}: {}", url, e),
        }
        Ok(page)
    }
}
