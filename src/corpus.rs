use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{NaiveDate, NaiveDateTime};

pub const SOURCE_KIND: &str = "linkedin";

const SLUG_DATE_FORMAT: &str = "%Y-%m-%d";

/// `YYYY-MM-DD-<source>-<id>`
pub fn slug_for(date: NaiveDateTime, id: &str) -> String {
    format!("{}-{SOURCE_KIND}-{id}", date.format(SLUG_DATE_FORMAT))
}

/// Splits a slug back into its date and id.
pub fn parse_slug(slug: &str) -> Option<(NaiveDate, &str)> {
    let date_part = slug.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, SLUG_DATE_FORMAT).ok()?;
    let id = slug.get(10..)?.strip_prefix('-')?.strip_prefix(SOURCE_KIND)?.strip_prefix('-')?;
    if id.is_empty() {
        return None;
    }
    Some((date, id))
}

/// id → slug index of a content directory.
///
/// The id is embedded in every filename, so the index is rebuilt by listing
/// the directory without reading any document body.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    dir: PathBuf,
    by_id: BTreeMap<String, BTreeSet<String>>,
}

impl CorpusIndex {
    pub fn scan(dir: &Path) -> anyhow::Result<Self> {
        let mut index = Self {
            dir: dir.to_path_buf(),
            by_id: BTreeMap::new(),
        };
        if !dir.exists() {
            return Ok(index);
        }

        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("read content dir: {}", dir.display()))?
        {
            let entry = entry.context("read content dir entry")?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((_, id)) = parse_slug(stem) else {
                continue;
            };
            index
                .by_id
                .entry(id.to_owned())
                .or_default()
                .insert(stem.to_owned());
        }

        tracing::debug!(dir = %dir.display(), ids = index.by_id.len(), "scanned content dir");
        Ok(index)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.md"))
    }

    pub fn slugs_for(&self, id: &str) -> Vec<String> {
        self.by_id
            .get(id)
            .map(|slugs| slugs.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.by_id.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub(crate) fn insert(&mut self, id: &str, slug: &str) {
        self.by_id
            .entry(id.to_owned())
            .or_default()
            .insert(slug.to_owned());
    }

    pub(crate) fn replace(&mut self, id: &str, slug: &str) {
        let mut slugs = BTreeSet::new();
        slugs.insert(slug.to_owned());
        self.by_id.insert(id.to_owned(), slugs);
    }
}
