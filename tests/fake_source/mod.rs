#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use postfold::source::{Fragment, MediaFetcher, PageSource};

#[derive(Debug, Clone, Default)]
pub struct FakeFragment {
    pub token: Option<String>,
    pub text: String,
    pub media: Vec<String>,
    pub date_text: String,
    /// Directory swapped for a regular file when this fragment is read.
    pub breaks_dir: Option<PathBuf>,
}

impl FakeFragment {
    pub fn post(id: &str, text: &str, date_text: &str) -> Self {
        Self {
            token: Some(format!("urn:li:activity:{id}")),
            text: text.to_owned(),
            media: Vec::new(),
            date_text: date_text.to_owned(),
            breaks_dir: None,
        }
    }

    pub fn with_media(mut self, url: &str) -> Self {
        self.media.push(url.to_owned());
        self
    }

    pub fn without_token(mut self) -> Self {
        self.token = None;
        self
    }

    /// Makes every later write into `dir` fail. The old contents are kept at
    /// `moved_dir(dir)`.
    pub fn breaking_dir(mut self, dir: &Path) -> Self {
        self.breaks_dir = Some(dir.to_path_buf());
        self
    }
}

pub fn moved_dir(dir: &Path) -> PathBuf {
    dir.with_extension("moved")
}

impl Fragment for FakeFragment {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn text(&self) -> anyhow::Result<String> {
        if let Some(dir) = &self.breaks_dir {
            std::fs::rename(dir, moved_dir(dir))?;
            std::fs::write(dir, b"not a directory")?;
        }
        Ok(self.text.clone())
    }

    fn media_urls(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.media.clone())
    }

    fn date_text(&self) -> anyhow::Result<String> {
        Ok(self.date_text.clone())
    }
}

/// In-memory page source that records what the pipeline asked for.
#[derive(Default)]
pub struct FakeSource {
    pub fragments: Vec<FakeFragment>,
    pub media: HashMap<String, Vec<u8>>,
    pub fetches: AtomicUsize,
    pub requested_limit: Mutex<Option<usize>>,
    pub hang_on_prepare: bool,
}

impl FakeSource {
    pub fn new(fragments: Vec<FakeFragment>) -> Self {
        Self {
            fragments,
            ..Self::default()
        }
    }

    pub fn with_media_bytes(mut self, url: &str, bytes: &[u8]) -> Self {
        self.media.insert(url.to_owned(), bytes.to_vec());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeSource {
    async fn fetch_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.media
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 for {url}"))
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn prepare(&self) -> anyhow::Result<()> {
        if self.hang_on_prepare {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn fetch_candidates(&self, limit: usize) -> anyhow::Result<Vec<Box<dyn Fragment>>> {
        *self.requested_limit.lock().unwrap() = Some(limit);
        Ok(self
            .fragments
            .iter()
            .take(limit)
            .cloned()
            .map(|f| Box::new(f) as Box<dyn Fragment>)
            .collect())
    }
}

pub fn long_text(topic: &str) -> String {
    format!(
        "{topic}. This post is long enough to count as a real paragraph rather than UI chrome, reactions or a bare link share."
    )
}
