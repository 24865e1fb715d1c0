use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract posts from an activity page into canonical documents.
    Ingest(IngestArgs),
    /// Apply the override table to already-written documents.
    FixDates(FixDatesArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Saved activity page (HTML).
    #[arg(long, conflicts_with = "url")]
    pub html: Option<String>,

    /// Live activity page URL (must be http/https). Uses `POSTFOLD_COOKIE`.
    #[arg(long)]
    pub url: Option<String>,

    /// Output directory for canonical documents.
    #[arg(long, default_value = "content/blog")]
    pub content_dir: String,

    /// Output directory for archived media.
    #[arg(long, default_value = "public/img/linkedin")]
    pub media_dir: String,

    /// Site-relative prefix under which archived media is served.
    #[arg(long, default_value = "/img/linkedin")]
    pub media_url_prefix: String,

    /// YAML override table (`"<id>": [year, month, day]`).
    #[arg(long)]
    pub overrides: Option<String>,

    /// Stop after creating this many documents.
    #[arg(long, default_value_t = 20)]
    pub max_posts: usize,

    /// Candidates requested per target document.
    #[arg(long, default_value_t = 2)]
    pub candidate_factor: usize,

    /// Minimum post text length in characters.
    #[arg(long, default_value_t = 100)]
    pub min_text_len: usize,

    /// Delay before each media request (politeness).
    #[arg(long, default_value_t = 200)]
    pub delay_ms: u64,

    /// Deadline for loading the activity page.
    #[arg(long, default_value_t = 60)]
    pub page_timeout_secs: u64,

    /// Per-request HTTP timeout.
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub summary_json: bool,
}

#[derive(Debug, Args)]
pub struct FixDatesArgs {
    /// Directory of canonical documents.
    #[arg(long, default_value = "content/blog")]
    pub content_dir: String,

    /// YAML override table (`"<id>": [year, month, day]`).
    #[arg(long)]
    pub overrides: String,
}
