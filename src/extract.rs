use anyhow::Context as _;

use crate::identity::{self, RecordId};
use crate::media::MediaArchiver;
use crate::source::{Fragment, MediaFetcher};

pub const PERMALINK_BASE: &str = "https://www.linkedin.com/feed/update/urn:li:activity:";

/// One accepted post, before date resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPost {
    pub id: RecordId,
    pub text: String,
    /// Raw date signal handed to the date resolver.
    pub date_text: String,
    pub source_url: String,
    /// Site-relative references of archived media, in document order.
    pub media: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("text too short ({len} < {min} chars)")]
    TooShort { len: usize, min: usize },

    #[error("unresolvable token: {0:?}")]
    UnresolvableToken(String),

    #[error("malformed fragment: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Accepted(RawPost),
    Rejected(RejectReason),
}

pub fn permalink(id: &RecordId) -> String {
    format!("{PERMALINK_BASE}{id}/")
}

#[derive(Debug, Clone)]
pub struct Extractor<'a> {
    archiver: &'a MediaArchiver,
    min_text_len: usize,
}

impl<'a> Extractor<'a> {
    pub fn new(archiver: &'a MediaArchiver, min_text_len: usize) -> Self {
        Self {
            archiver,
            min_text_len,
        }
    }

    /// Never fails: structural errors in the fragment become a rejection.
    pub async fn extract<F>(&self, fetcher: &F, fragment: &dyn Fragment, index: usize) -> ExtractOutcome
    where
        F: MediaFetcher + ?Sized,
    {
        match self.try_extract(fetcher, fragment, index).await {
            Ok(outcome) => outcome,
            Err(err) => ExtractOutcome::Rejected(RejectReason::Malformed(format!("{err:#}"))),
        }
    }

    async fn try_extract<F>(
        &self,
        fetcher: &F,
        fragment: &dyn Fragment,
        index: usize,
    ) -> anyhow::Result<ExtractOutcome>
    where
        F: MediaFetcher + ?Sized,
    {
        let token = fragment.token();
        let Some(id) = identity::resolve(token.as_deref(), index) else {
            return Ok(ExtractOutcome::Rejected(RejectReason::UnresolvableToken(
                token.unwrap_or_default(),
            )));
        };

        let text = fragment.text().context("read fragment text")?.trim().to_owned();
        let len = text.chars().count();
        if len < self.min_text_len {
            return Ok(ExtractOutcome::Rejected(RejectReason::TooShort {
                len,
                min: self.min_text_len,
            }));
        }

        let mut media = Vec::new();
        for url in fragment.media_urls().context("read fragment media")? {
            if let Some(reference) = self.archiver.archive(fetcher, &url, id.as_str()).await {
                if !media.contains(&reference) {
                    media.push(reference);
                }
            }
        }

        let date_text = fragment
            .date_text()
            .context("read fragment date")?
            .trim()
            .to_owned();

        Ok(ExtractOutcome::Accepted(RawPost {
            source_url: permalink(&id),
            id,
            text,
            date_text,
            media,
        }))
    }
}
