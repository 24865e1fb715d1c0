use std::fmt;

/// Stable key of one ingested post.
///
/// Ids derived from a source token survive across runs. Positional ids
/// (`post-<index>`) are synthesized when the fragment carries no token; they
/// depend on candidate order and must not be trusted for dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    value: String,
    quality: IdQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdQuality {
    Stable,
    Positional,
}

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn quality(&self) -> IdQuality {
        self.quality
    }

    pub fn is_stable(&self) -> bool {
        self.quality == IdQuality::Stable
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Derives a record id from an opaque source token such as
/// `urn:li:activity:7317854166079397891`.
///
/// Returns `None` when the token is present but has no usable trailing
/// segment (e.g. `"urn:li:"`).
pub fn resolve(token: Option<&str>, index: usize) -> Option<RecordId> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Some(RecordId {
            value: format!("post-{index}"),
            quality: IdQuality::Positional,
        });
    };

    let value = token.rsplit(':').next().unwrap_or(token).trim();
    if value.is_empty() || !value.chars().all(is_filename_safe) {
        return None;
    }

    Some(RecordId {
        value: value.to_owned(),
        quality: IdQuality::Stable,
    })
}

// Ids end up in filenames and slugs.
fn is_filename_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}
