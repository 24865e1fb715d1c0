use std::io::IsTerminal as _;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper_util=warn";

/// Logs go to stderr so stdout stays free for the run summary.
///
/// `POSTFOLD_LOG` takes precedence over `RUST_LOG`.
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("POSTFOLD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("build log filter")?;

    let stderr = std::io::stderr();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(stderr.is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
