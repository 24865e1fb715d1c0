use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{FixDatesArgs, IngestArgs};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Settings for talking to the activity page and media CDN.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub user_agent: String,
    /// Raw `Cookie` header sent with page requests.
    pub cookie: Option<String>,
    /// Politeness delay before each media fetch.
    pub delay: Duration,
    pub request_timeout: Duration,
}

impl SourceConfig {
    pub fn from_env(delay: Duration, request_timeout: Duration) -> Self {
        let user_agent = std::env::var("POSTFOLD_USER_AGENT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());
        let cookie = std::env::var("POSTFOLD_COOKIE")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        Self {
            user_agent,
            cookie,
            delay,
            request_timeout,
        }
    }
}

/// Settings for one ingest run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub content_dir: PathBuf,
    pub media_dir: PathBuf,
    pub media_url_prefix: String,
    pub overrides: Option<PathBuf>,
    /// Stop once this many documents were created.
    pub target: usize,
    /// Candidates requested per target document; some will be rejected.
    pub candidate_factor: usize,
    pub min_text_len: usize,
    /// Deadline for setup and candidate fetching.
    pub page_timeout: Duration,
    /// Consecutive write failures tolerated before the run aborts.
    pub max_consecutive_write_failures: usize,
}

impl IngestConfig {
    pub fn candidate_limit(&self) -> usize {
        self.target.saturating_mul(self.candidate_factor.max(1))
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content/blog"),
            media_dir: PathBuf::from("public/img/linkedin"),
            media_url_prefix: "/img/linkedin".to_owned(),
            overrides: None,
            target: 20,
            candidate_factor: 2,
            min_text_len: 100,
            page_timeout: Duration::from_secs(60),
            max_consecutive_write_failures: 3,
        }
    }
}

impl From<&IngestArgs> for IngestConfig {
    fn from(args: &IngestArgs) -> Self {
        Self {
            content_dir: PathBuf::from(&args.content_dir),
            media_dir: PathBuf::from(&args.media_dir),
            media_url_prefix: args.media_url_prefix.clone(),
            overrides: args.overrides.as_ref().map(PathBuf::from),
            target: args.max_posts,
            candidate_factor: args.candidate_factor,
            min_text_len: args.min_text_len,
            page_timeout: Duration::from_secs(args.page_timeout_secs),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixDatesConfig {
    pub content_dir: PathBuf,
    pub overrides: PathBuf,
}

impl From<&FixDatesArgs> for FixDatesConfig {
    fn from(args: &FixDatesArgs) -> Self {
        Self {
            content_dir: PathBuf::from(&args.content_dir),
            overrides: PathBuf::from(&args.overrides),
        }
    }
}
