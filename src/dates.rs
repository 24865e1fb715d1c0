use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context as _;
use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Front matter and slug date format. Seconds precision, no timezone.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// How far a resolved date can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateConfidence {
    ExactOverride,
    ApproximateRelative,
    UnknownFallback,
}

impl DateConfidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactOverride => "exact-override",
            Self::ApproximateRelative => "approximate-relative",
            Self::UnknownFallback => "unknown-fallback",
        }
    }
}

impl fmt::Display for DateConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub at: NaiveDateTime,
    pub confidence: DateConfidence,
}

impl ResolvedDate {
    pub fn override_date(date: NaiveDate) -> Self {
        Self {
            at: at_noon(date),
            confidence: DateConfidence::ExactOverride,
        }
    }
}

/// Curated id → calendar date corrections. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: BTreeMap<String, NaiveDate>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads a YAML mapping of `"<id>": [year, month, day]`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read override table: {}", path.display()))?;
        Self::from_yaml_str(&yaml)
            .with_context(|| format!("parse override table: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::empty());
        }
        let raw: BTreeMap<String, (i32, u32, u32)> =
            serde_yaml::from_str(yaml).context("deserialize override table")?;

        let mut entries = BTreeMap::new();
        for (id, (year, month, day)) in raw {
            let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                anyhow::anyhow!("invalid override date for {id}: ({year}, {month}, {day})")
            })?;
            entries.insert(id, date);
        }
        Ok(Self { entries })
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, NaiveDate)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(id, d)| (id.into(), d)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<NaiveDate> {
        self.entries.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DateResolver {
    overrides: OverrideTable,
}

impl DateResolver {
    pub fn new(overrides: OverrideTable) -> Self {
        Self { overrides }
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Override table first, then relative text, then `now`. Never fails.
    pub fn resolve(&self, id: &str, date_text: &str, now: NaiveDateTime) -> ResolvedDate {
        if let Some(date) = self.overrides.get(id) {
            return ResolvedDate::override_date(date);
        }

        match parse_relative(date_text, now) {
            Some(at) => ResolvedDate {
                at,
                confidence: DateConfidence::ApproximateRelative,
            },
            None => ResolvedDate {
                at: now,
                confidence: DateConfidence::UnknownFallback,
            },
        }
    }
}

pub fn at_noon(date: NaiveDate) -> NaiveDateTime {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(noon)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    // "mo" must be checked before the minute forms.
    fn parse(word: &str) -> Option<Self> {
        if word.starts_with("mo") {
            Some(Self::Month)
        } else if word == "m" || word.starts_with("mi") {
            Some(Self::Minute)
        } else if word.starts_with('h') {
            Some(Self::Hour)
        } else if word.starts_with('d') {
            Some(Self::Day)
        } else if word.starts_with('w') {
            Some(Self::Week)
        } else if word.starts_with('y') {
            Some(Self::Year)
        } else {
            None
        }
    }
}

static QUANTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*([a-z]*)").expect("quantity regex"));
static NOW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bnow\b").expect("now regex"));

/// Parses relative text like `"3 days ago"`, `"2mo"`, `"1yr • Edited"`.
///
/// Returns `None` for unitless or unparseable text and for any quantity whose
/// subtraction would leave chrono's representable range.
pub fn parse_relative(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if NOW_RE.is_match(&text) {
        return Some(now);
    }

    let caps = QUANTITY_RE.captures(&text)?;
    let quantity: u32 = caps.get(1)?.as_str().parse().ok()?;
    let unit = Unit::parse(caps.get(2).map_or("", |m| m.as_str()))?;
    if quantity == 0 {
        return Some(now);
    }

    let n = i64::from(quantity);
    match unit {
        Unit::Minute => now.checked_sub_signed(TimeDelta::try_minutes(n)?),
        Unit::Hour => now.checked_sub_signed(TimeDelta::try_hours(n)?),
        Unit::Day => now.checked_sub_signed(TimeDelta::try_days(n)?),
        Unit::Week => now.checked_sub_signed(TimeDelta::try_weeks(n)?),
        Unit::Month => now.checked_sub_months(Months::new(quantity)),
        Unit::Year => now.checked_sub_months(Months::new(quantity.checked_mul(12)?)),
    }
}
