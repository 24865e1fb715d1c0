use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use sha2::Digest as _;
use url::Url;

use crate::source::MediaFetcher;

const DECORATIVE_MARKERS: &[&str] = &["emoji", "icon"];
const DEFAULT_EXTENSION: &str = "jpg";

/// Planned local copy of a remote asset.
///
/// `local_path` depends only on `(owner_id, remote_url)`, so an existence
/// check can short-circuit a re-download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub remote_url: String,
    pub owner_id: String,
    pub content_hash: String,
    pub local_path: PathBuf,
    /// Site-relative path written into document bodies.
    pub reference: String,
}

#[derive(Debug, Clone)]
pub struct MediaArchiver {
    dir: PathBuf,
    url_prefix: String,
}

impl MediaArchiver {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns `None` for non-network and decorative URLs.
    pub fn plan(&self, remote_url: &str, owner_id: &str) -> Option<MediaAsset> {
        let url = Url::parse(remote_url).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        if is_decorative(remote_url) {
            return None;
        }

        let content_hash = url_hash(remote_url);
        let extension = extension_of(&url);
        let filename = format!("{owner_id}-{content_hash}.{extension}");

        Some(MediaAsset {
            remote_url: remote_url.to_owned(),
            owner_id: owner_id.to_owned(),
            content_hash,
            local_path: self.dir.join(&filename),
            reference: format!("{}/{filename}", self.url_prefix),
        })
    }

    /// Persists `remote_url` once and returns its site-relative reference.
    ///
    /// Any failure is logged and yields `None`; the owning post proceeds
    /// without the asset.
    pub async fn archive<F>(&self, fetcher: &F, remote_url: &str, owner_id: &str) -> Option<String>
    where
        F: MediaFetcher + ?Sized,
    {
        let Some(asset) = self.plan(remote_url, owner_id) else {
            tracing::debug!(url = remote_url, "skip non-archivable media url");
            return None;
        };

        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), err = %err, "media dir unavailable");
            return None;
        }
        if asset.local_path.exists() {
            tracing::debug!(path = %asset.local_path.display(), "media already archived");
            return Some(asset.reference);
        }

        let bytes = match fetcher.fetch_bytes(remote_url).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                tracing::warn!(url = remote_url, owner = owner_id, "media response was empty");
                return None;
            }
            Err(err) => {
                tracing::warn!(url = remote_url, owner = owner_id, err = %format!("{err:#}"), "media fetch failed");
                return None;
            }
        };

        if let Err(err) = self.store(&asset, &bytes) {
            tracing::warn!(path = %asset.local_path.display(), err = %format!("{err:#}"), "media write failed");
            return None;
        }

        tracing::info!(path = %asset.local_path.display(), bytes = bytes.len(), "media archived");
        Some(asset.reference)
    }

    fn store(&self, asset: &MediaAsset, bytes: &[u8]) -> anyhow::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("create media temp file in {}", self.dir.display()))?;
        tmp.write_all(bytes).context("write media temp file")?;
        tmp.flush().context("flush media temp file")?;
        tmp.persist(&asset.local_path)
            .map_err(|err| err.error)
            .with_context(|| format!("persist media: {}", asset.local_path.display()))?;
        Ok(())
    }
}

fn is_decorative(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    DECORATIVE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Short digest of the URL string, not of the served bytes.
pub fn url_hash(url: &str) -> String {
    let digest = sha2::Sha256::digest(url.as_bytes());
    hex::encode(digest)[..8].to_owned()
}

fn extension_of(url: &Url) -> String {
    let last_segment = url.path().rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_owned(),
    }
}
