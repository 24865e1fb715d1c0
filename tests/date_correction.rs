mod fake_source;

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use fake_source::{FakeFragment, FakeSource, long_text};
use postfold::config::IngestConfig;
use postfold::dates::{DATE_FORMAT, DateConfidence, DateResolver, OverrideTable};
use postfold::document::parse_document;
use postfold::fix_dates::fix_dates;
use postfold::pipeline::ingest;

fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-06-15T12:00:00", DATE_FORMAT).unwrap()
}

fn documents_for(dir: &Path, id: &str) -> anyhow::Result<Vec<String>> {
    let suffix = format!("-linkedin-{id}.md");
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.ends_with(&suffix) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn correction_leaves_exactly_one_document_per_id() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let config = IngestConfig {
        content_dir: temp.path().join("content/blog"),
        media_dir: temp.path().join("public/img/linkedin"),
        page_timeout: Duration::from_secs(5),
        ..IngestConfig::default()
    };
    let source = FakeSource::new(vec![
        FakeFragment::post("6758661754030440448", &long_text("Website launch"), "4yr"),
        FakeFragment::post("7000000000000000001", &long_text("Unlisted"), "2w"),
    ]);

    let stats = ingest(
        &source,
        &config,
        &DateResolver::new(OverrideTable::empty()),
        now(),
    )
    .await?;
    assert_eq!(stats.created, 2);
    assert_eq!(
        documents_for(&config.content_dir, "6758661754030440448")?,
        vec!["2021-06-15-linkedin-6758661754030440448.md"]
    );

    let overrides = OverrideTable::from_yaml_str("\"6758661754030440448\": [2021, 1, 25]\n")?;
    let fixed = fix_dates(&config.content_dir, &overrides)?;
    assert_eq!(fixed.fixed, 1);
    assert_eq!(fixed.unchanged, 0);
    assert_eq!(fixed.unknown_ids, vec!["7000000000000000001"]);

    assert_eq!(
        documents_for(&config.content_dir, "6758661754030440448")?,
        vec!["2021-01-25-linkedin-6758661754030440448.md"]
    );
    let contents = std::fs::read_to_string(
        config
            .content_dir
            .join("2021-01-25-linkedin-6758661754030440448.md"),
    )?;
    let (front, rest) = parse_document(&contents)?;
    assert_eq!(front.date, "2021-01-25T12:00:00");
    assert_eq!(front.date_confidence, Some(DateConfidence::ExactOverride));
    assert_eq!(front.title, "Website launch");
    assert!(rest.contains("Originally posted on [LinkedIn]"));

    // Second pass is a no-op.
    let again = fix_dates(&config.content_dir, &overrides)?;
    assert_eq!(again.fixed, 0);
    assert_eq!(again.unchanged, 1);

    // Re-ingesting with the overrides loaded does not resurrect the old slug.
    let rerun = ingest(&source, &config, &DateResolver::new(overrides), now()).await?;
    assert_eq!(rerun.created, 0);
    assert_eq!(rerun.skipped_existing, 2);
    assert_eq!(
        documents_for(&config.content_dir, "6758661754030440448")?.len(),
        1
    );
    Ok(())
}

#[test]
fn fix_dates_on_empty_dir_reports_nothing() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let overrides =
        OverrideTable::from_entries([("1", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())]);
    let stats = fix_dates(temp.path(), &overrides)?;
    assert_eq!(stats.fixed, 0);
    assert!(stats.unknown_ids.is_empty());
    Ok(())
}

#[test]
fn unreadable_document_does_not_stop_the_pass() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let dir = temp.path();
    std::fs::write(dir.join("2024-01-01-linkedin-1.md"), "no front matter here\n")?;
    std::fs::write(
        dir.join("2024-01-01-linkedin-2.md"),
        "---\ntitle: \"Valid\"\ndate: 2024-01-01T12:00:00\ntags: [\"LinkedIn\"]\nlinkedinUrl: \"https://www.linkedin.com/feed/update/urn:li:activity:2/\"\nsource: \"linkedin\"\n---\n\nBody two\n",
    )?;
    // Hand-edited: the url and source keys were deleted.
    std::fs::write(
        dir.join("2024-01-01-linkedin-3.md"),
        "---\ntitle: \"Edited\"\ndate: 2024-01-01T12:00:00\n---\n\nBody three\n",
    )?;
    let overrides = OverrideTable::from_yaml_str(
        "\"1\": [2019, 1, 1]\n\"2\": [2019, 1, 1]\n\"3\": [2019, 1, 1]\n",
    )?;

    let stats = fix_dates(dir, &overrides)?;
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.fixed, 2);
    assert!(stats.unknown_ids.is_empty());

    assert_eq!(
        std::fs::read_to_string(dir.join("2024-01-01-linkedin-1.md"))?,
        "no front matter here\n"
    );
    assert!(dir.join("2019-01-01-linkedin-2.md").exists());
    assert!(!dir.join("2024-01-01-linkedin-2.md").exists());

    let edited = std::fs::read_to_string(dir.join("2019-01-01-linkedin-3.md"))?;
    let (front, rest) = parse_document(&edited)?;
    assert_eq!(front.title, "Edited");
    assert_eq!(front.date, "2019-01-01T12:00:00");
    assert_eq!(rest, "\nBody three\n");
    Ok(())
}
