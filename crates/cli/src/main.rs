use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::LevelFilter;
use mapdump_core::{default_output_dir, run, Config, FetchError, HttpFetcher, RunError};
use url::Url;

#[derive(Parser)]
#[command(version, about = "Download original sources from a site's source maps")]
struct Cli {
    /// URL of the site
    #[arg(short, long)]
    url: String,

    /// Output the files to given path (default: ./src_<domain>)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Download stylesheet (CSS) sources as well
    #[arg(short, long)]
    styles: bool,

    /// Print every discovered asset and source map
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// Assets processed concurrently
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Attempts per request, including the first
    #[arg(long, default_value_t = 3)]
    retries: usize,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("could not build http client: {0}")]
    Client(#[from] FetchError),
    #[error("could not encode report: {0}")]
    Report(#[from] serde_json::Error),
    #[error("interrupted")]
    Interrupted,
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Error
    } else if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn build_config(cli: &Cli) -> Config {
    let output = cli.output.clone().unwrap_or_else(|| match Url::parse(&cli.url) {
        Ok(u) => default_output_dir(&u),
        Err(_) => PathBuf::from("src"),
    });
    let mut config = Config::new(output);
    config.download_styles = cli.styles;
    config.verbose = cli.verbose;
    config.concurrency = cli.concurrency.max(1);
    config.retry_attempts = cli.retries.max(1);
    config.timeout = Duration::from_secs(cli.timeout.max(1));
    config
}

async fn execute(cli: &Cli) -> Result<(), CliError> {
    let config = build_config(cli);
    if cli.verbose {
        log::info!("output directory: {}", config.output_directory.display());
        log::info!("styles: {}, concurrency: {}", config.download_styles, config.concurrency);
    }
    let fetcher = HttpFetcher::new(config.timeout, &config.user_agent, config.retry_attempts)?;

    let report = tokio::select! {
        res = run(&cli.url, &config, Arc::new(fetcher)) => res?,
        _ = tokio::signal::ctrl_c() => return Err(CliError::Interrupted),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Interrupted) => {
            log::error!("interrupted, abandoning in-flight downloads");
            ExitCode::from(130)
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
