use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    postfold::logging::init().context("init logging")?;

    let cli = postfold::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        postfold::cli::Command::Ingest(args) => {
            postfold::pipeline::run(args).await.context("ingest")?;
        }
        postfold::cli::Command::FixDates(args) => {
            postfold::fix_dates::run(args).context("fix dates")?;
        }
    }

    Ok(())
}
