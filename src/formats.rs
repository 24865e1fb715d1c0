use serde::{Deserialize, Serialize};

use crate::dates::DateConfidence;

/// Metadata block of a canonical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFrontMatter {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "linkedinUrl", default)]
    pub permalink: String,
    #[serde(default)]
    pub source: String,
    #[serde(
        rename = "dateConfidence",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date_confidence: Option<DateConfidence>,
    /// Keys added by hand after ingest; carried through corrections untouched.
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// Totals reported at the end of an ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub candidates: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub rejected: usize,
    pub write_failed: usize,
    /// Set when repeated write failures stopped the run early.
    #[serde(default)]
    pub aborted: bool,
    /// Ids whose date fell back to the run's current instant.
    pub unknown_date_ids: Vec<String>,
    /// Positional ids synthesized for fragments without a source token.
    pub positional_ids: Vec<String>,
}

/// Totals reported by the date-correction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixStats {
    pub fixed: usize,
    pub unchanged: usize,
    /// Documents that could not be read, parsed or rewritten.
    pub failed: usize,
    pub unknown_ids: Vec<String>,
}
