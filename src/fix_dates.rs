use std::path::Path;

use anyhow::Context as _;

use crate::cli::FixDatesArgs;
use crate::config::FixDatesConfig;
use crate::dates::{OverrideTable, ResolvedDate};
use crate::document::{CanonicalWriter, CorrectOutcome, parse_document};
use crate::formats::FixStats;

pub fn run(args: FixDatesArgs) -> anyhow::Result<()> {
    let config = FixDatesConfig::from(&args);
    let overrides = OverrideTable::load(&config.overrides).context("load override table")?;
    let stats = fix_dates(&config.content_dir, &overrides)?;

    println!("Fixed:     {}", stats.fixed);
    println!("Unchanged: {}", stats.unchanged);
    println!("Unknown:   {}", stats.unknown_ids.len());
    println!("Failed:    {}", stats.failed);
    if stats.failed > 0 {
        anyhow::bail!("{} documents could not be corrected", stats.failed);
    }
    Ok(())
}

/// Re-dates every document whose id has an override and moves it under the
/// corrected slug. Ids without an override are reported, not touched. A
/// document that cannot be corrected is counted and skipped.
pub fn fix_dates(content_dir: &Path, overrides: &OverrideTable) -> anyhow::Result<FixStats> {
    let mut writer = CanonicalWriter::open(content_dir).context("open content dir")?;
    let mut stats = FixStats::default();

    for id in writer.index().ids() {
        let Some(date) = overrides.get(&id) else {
            let confidence = writer
                .index()
                .slugs_for(&id)
                .first()
                .and_then(|slug| {
                    let path = writer.index().path_for(slug);
                    let contents = std::fs::read_to_string(path).ok()?;
                    let (front, _) = parse_document(&contents).ok()?;
                    front.date_confidence
                });
            tracing::warn!(id = %id, confidence = ?confidence, "no override for id");
            stats.unknown_ids.push(id);
            continue;
        };

        match writer.correct(&id, &ResolvedDate::override_date(date)) {
            Ok(CorrectOutcome::Renamed { from, to }) => {
                tracing::info!(id = %id, from = ?from, to = %to, "date corrected");
                stats.fixed += 1;
            }
            Ok(CorrectOutcome::Unchanged { slug }) => {
                tracing::debug!(id = %id, slug = %slug, "date already correct");
                stats.unchanged += 1;
            }
            Ok(CorrectOutcome::Missing) => {}
            Err(err) => {
                tracing::error!(id = %id, err = %format!("{err:#}"), "date correction failed");
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        fixed = stats.fixed,
        unchanged = stats.unchanged,
        unknown = stats.unknown_ids.len(),
        failed = stats.failed,
        "date correction finished"
    );
    Ok(stats)
}
