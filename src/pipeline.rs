use std::future::Future;
use std::io::Write as _;
use std::time::Duration;

use anyhow::Context as _;
use chrono::NaiveDateTime;
use url::Url;

use crate::cli::IngestArgs;
use crate::config::{IngestConfig, SourceConfig};
use crate::dates::{DateConfidence, DateResolver, OverrideTable};
use crate::document::{CanonicalWriter, WriteOutcome};
use crate::extract::{ExtractOutcome, Extractor};
use crate::formats::RunStats;
use crate::html_source::{HtmlPageSource, PageOrigin};
use crate::media::MediaArchiver;
use crate::source::PageSource;

pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let config = IngestConfig::from(&args);

    let overrides = match config.overrides.as_deref() {
        Some(path) => OverrideTable::load(path).context("load override table")?,
        None => OverrideTable::empty(),
    };
    tracing::info!(entries = overrides.len(), "override table loaded");
    let resolver = DateResolver::new(overrides);

    let origin = match (&args.html, &args.url) {
        (Some(path), None) => PageOrigin::File(path.into()),
        (None, Some(url)) => {
            let url = Url::parse(url).context("parse --url")?;
            if url.scheme() != "http" && url.scheme() != "https" {
                anyhow::bail!("--url must be http/https: {url}");
            }
            PageOrigin::Url(url)
        }
        _ => anyhow::bail!("exactly one of --html or --url is required"),
    };
    let source_config = SourceConfig::from_env(
        Duration::from_millis(args.delay_ms),
        Duration::from_secs(args.request_timeout_secs),
    );
    let source = HtmlPageSource::new(origin, source_config).context("build page source")?;

    let now = current_instant();
    let stats = ingest(&source, &config, &resolver, now).await?;

    let mut stdout = std::io::stdout().lock();
    if args.summary_json {
        serde_json::to_writer_pretty(&mut stdout, &stats).context("write summary json")?;
        writeln!(stdout).context("write summary newline")?;
    } else {
        write_summary(&mut stdout, &stats).context("write summary")?;
    }
    if stats.aborted {
        anyhow::bail!(
            "run aborted after {} consecutive write failures",
            config.max_consecutive_write_failures.max(1)
        );
    }
    Ok(())
}

/// Naive UTC, the clock every document `date` is expressed in.
pub fn current_instant() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub fn write_summary(out: &mut impl std::io::Write, stats: &RunStats) -> std::io::Result<()> {
    writeln!(out, "Summary:")?;
    writeln!(out, "  Created:      {}", stats.created)?;
    writeln!(out, "  Skipped:      {}", stats.skipped_existing)?;
    writeln!(out, "  Rejected:     {}", stats.rejected)?;
    writeln!(out, "  Write failed: {}", stats.write_failed)?;
    writeln!(out, "  Unknown date: {}", stats.unknown_date_ids.len())?;
    writeln!(out, "  Positional:   {}", stats.positional_ids.len())?;
    writeln!(out, "  Candidates:   {}", stats.candidates)?;
    if stats.aborted {
        writeln!(out, "  Aborted:      yes")?;
    }
    Ok(())
}

/// Runs one ingest pass against `source`.
///
/// Every fragment is committed or skipped on its own. Setup failures
/// (content dir, page setup) are errors; repeated write failures stop the
/// loop and come back as `RunStats::aborted`.
pub async fn ingest<S>(
    source: &S,
    config: &IngestConfig,
    resolver: &DateResolver,
    now: NaiveDateTime,
) -> anyhow::Result<RunStats>
where
    S: PageSource + ?Sized,
{
    let mut writer = CanonicalWriter::open(&config.content_dir).context("open content dir")?;
    let archiver = MediaArchiver::new(&config.media_dir, config.media_url_prefix.clone());
    let extractor = Extractor::new(&archiver, config.min_text_len);

    with_deadline(config.page_timeout, "page setup", source.prepare()).await?;
    let limit = config.candidate_limit();
    let candidates = with_deadline(
        config.page_timeout,
        "candidate fetch",
        source.fetch_candidates(limit),
    )
    .await?;

    let mut stats = RunStats {
        candidates: candidates.len(),
        ..RunStats::default()
    };
    let mut consecutive_write_failures = 0_usize;

    for (index, fragment) in candidates.iter().enumerate() {
        if stats.created >= config.target {
            tracing::info!(created = stats.created, "target reached");
            break;
        }

        let post = match extractor.extract(source, fragment.as_ref(), index).await {
            ExtractOutcome::Accepted(post) => post,
            ExtractOutcome::Rejected(reason) => {
                tracing::info!(index, %reason, "fragment rejected");
                stats.rejected += 1;
                continue;
            }
        };

        let id = post.id.as_str().to_owned();
        if !post.id.is_stable() {
            tracing::warn!(id = %id, "no source token; positional id is not stable across runs");
            stats.positional_ids.push(id.clone());
        }

        let date = resolver.resolve(&id, &post.date_text, now);
        if date.confidence == DateConfidence::UnknownFallback {
            tracing::warn!(id = %id, date_text = %post.date_text, "date unresolved; using current time");
            stats.unknown_date_ids.push(id.clone());
        }

        match writer.write(&post, &date) {
            Ok(WriteOutcome::Created { slug }) => {
                tracing::info!(id = %id, slug = %slug, confidence = %date.confidence, "created");
                stats.created += 1;
                consecutive_write_failures = 0;
            }
            Ok(WriteOutcome::Skipped { slug }) => {
                tracing::info!(id = %id, slug = %slug, "exists");
                stats.skipped_existing += 1;
                consecutive_write_failures = 0;
            }
            Err(err) => {
                tracing::error!(id = %id, err = %format!("{err:#}"), "write failed");
                stats.write_failed += 1;
                consecutive_write_failures += 1;
                if consecutive_write_failures >= config.max_consecutive_write_failures.max(1) {
                    tracing::error!(
                        consecutive = consecutive_write_failures,
                        "storage keeps failing; stopping run"
                    );
                    stats.aborted = true;
                    break;
                }
            }
        }
    }

    tracing::info!(
        created = stats.created,
        skipped = stats.skipped_existing,
        rejected = stats.rejected,
        write_failed = stats.write_failed,
        aborted = stats.aborted,
        unknown_dates = stats.unknown_date_ids.len(),
        "ingest finished"
    );
    Ok(stats)
}

async fn with_deadline<T>(
    deadline: Duration,
    what: &str,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result.with_context(|| what.to_owned()),
        Err(_) => anyhow::bail!("{what} timed out after {}s", deadline.as_secs()),
    }
}
