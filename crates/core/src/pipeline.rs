//! End-to-end run: fetch the page, discover assets, then follow each asset to
//! its source map and reconstruct the sources it embeds.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::assets::{extract_assets, of_kind, AssetKind, AssetReference};
use crate::config::Config;
use crate::download_manager::run_pool;
use crate::fetch::{FetchError, Fetcher};
use crate::file_io::{write_sources, WriteSummary};
use crate::output::{prepare_output_root, validate_output_dir, OutputDirError};
use crate::sm_parse::{fetch_and_decode, sources_list, MapError};
use crate::sourcemap::{locate_sourcemap, MapReference};
use crate::url_utils::{resolve, Resolution};

/// Conditions that stop a run before any useful work is done.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("'{0}' is not a valid http(s) url")]
    InvalidUrl(String),
    #[error(transparent)]
    OutputDir(#[from] OutputDirError),
    #[error("failed to fetch page {url}: {source}")]
    PageFetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("no file links found in response from '{0}'")]
    DiscoveryEmpty(Url),
}

/// Why a single asset produced nothing. Recorded and skipped.
#[derive(Error, Debug)]
pub enum AssetFailure {
    #[error("failed to fetch asset {url}: {source}")]
    AssetFetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("cannot resolve source map path {raw:?} declared by {asset}")]
    UnresolvedMap { asset: Url, raw: String },
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("writer for {url} did not finish: {reason}")]
    Write { url: Url, reason: String },
}

/// What happened to one asset.
#[derive(Debug)]
pub enum AssetOutcome {
    /// The asset declares no source map.
    NoMap(AssetReference),
    Reconstructed {
        map: MapReference,
        summary: WriteSummary,
    },
    Failed {
        asset: AssetReference,
        failure: AssetFailure,
    },
}

/// Per-class discovery counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ClassCounts {
    pub assets: usize,
    pub maps: usize,
    pub maps_decoded: usize,
}

/// Final account of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub page: Url,
    pub output_directory: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scripts: ClassCounts,
    pub styles: Option<ClassCounts>,
    pub files: WriteSummary,
    pub failures: Vec<String>,
}

impl RunReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

struct JobContext {
    fetcher: Arc<dyn Fetcher>,
    page: Url,
    output_root: PathBuf,
    verbose: bool,
}

fn parse_target(page_url: &str) -> Result<Url, RunError> {
    match Url::parse(page_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => Ok(u),
        _ => Err(RunError::InvalidUrl(page_url.to_string())),
    }
}

/// Reconstruct the sources behind `page_url` into `config.output_directory`.
///
/// Returns `Err` only for conditions that prevent any work: a bad URL, an
/// unusable output directory, an unreachable page, or a page linking no
/// assets of any requested class. Everything else lands in the report.
pub async fn run(page_url: &str, config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<RunReport, RunError> {
    let started_at = Utc::now();
    let page = parse_target(page_url)?;
    validate_output_dir(&config.output_directory)?;

    let body = fetcher
        .fetch_text(&page)
        .await
        .map_err(|source| RunError::PageFetch { url: page.clone(), source })?;

    let assets = extract_assets(&body, &page, config.asset_classes());
    let script_count = of_kind(&assets, AssetKind::Script).count();
    let style_count = of_kind(&assets, AssetKind::Stylesheet).count();

    if assets.is_empty() {
        return Err(RunError::DiscoveryEmpty(page));
    }
    log::info!("found {script_count} script(s) on {page}");
    if script_count == 0 {
        log::warn!("no scripts linked from {page}");
    }
    if config.download_styles {
        log::info!("found {style_count} stylesheet(s) on {page}");
        if style_count == 0 {
            log::warn!("no stylesheets linked from {page}");
        }
    }
    for asset in &assets {
        if config.verbose {
            log::info!("{:?}: {}", asset.kind, asset.url);
        } else {
            log::debug!("{:?}: {}", asset.kind, asset.url);
        }
    }

    prepare_output_root(&config.output_directory)?;

    let ctx = Arc::new(JobContext {
        fetcher,
        page: page.clone(),
        output_root: config.output_directory.clone(),
        verbose: config.verbose,
    });
    let outcomes = run_pool(assets, config.concurrency, move |asset| {
        let ctx = Arc::clone(&ctx);
        async move { process_asset(&ctx, asset).await }
    })
    .await;

    let report = summarize(page, config, started_at, script_count, style_count, &outcomes);
    log_report(&report);
    Ok(report)
}

/// Fetch one asset, follow its source map and write what it embeds.
async fn process_asset(ctx: &JobContext, asset: AssetReference) -> AssetOutcome {
    match reconstruct_asset(ctx, &asset).await {
        Ok(Some((map, summary))) => AssetOutcome::Reconstructed { map, summary },
        Ok(None) => AssetOutcome::NoMap(asset),
        Err(failure) => {
            log::debug!("{} failed: {failure}", asset.url);
            AssetOutcome::Failed { asset, failure }
        }
    }
}

async fn reconstruct_asset(
    ctx: &JobContext,
    asset: &AssetReference,
) -> Result<Option<(MapReference, WriteSummary)>, AssetFailure> {
    let text = ctx
        .fetcher
        .fetch_text(&asset.url)
        .await
        .map_err(|source| AssetFailure::AssetFetch { url: asset.url.clone(), source })?;

    let Some(raw_path) = locate_sourcemap(&text, asset.kind.extension()) else {
        log::debug!("no source map declared by {}", asset.url);
        return Ok(None);
    };

    let resolved = match resolve(&ctx.page, &asset.url, &raw_path) {
        Resolution::Resolved(url) => url,
        Resolution::Opaque(raw) => {
            return Err(AssetFailure::UnresolvedMap { asset: asset.url.clone(), raw });
        }
    };
    if ctx.verbose {
        log::info!("source map {resolved} (from {})", asset.url);
    }

    let entries = fetch_and_decode(ctx.fetcher.as_ref(), &resolved).await?;
    if ctx.verbose {
        for source in sources_list(&entries) {
            log::info!("  {source}");
        }
    }
    let map = MapReference { asset: asset.clone(), raw_path, resolved };

    // Filesystem work stays off the async workers.
    let root = ctx.output_root.clone();
    let summary = tokio::task::spawn_blocking(move || write_sources(&root, &entries))
        .await
        .map_err(|e| AssetFailure::Write { url: map.resolved.clone(), reason: e.to_string() })?;

    log::info!(
        "{}: wrote {} file(s), {} without content",
        map.resolved,
        summary.written,
        summary.skipped
    );
    Ok(Some((map, summary)))
}

fn summarize(
    page: Url,
    config: &Config,
    started_at: DateTime<Utc>,
    script_count: usize,
    style_count: usize,
    outcomes: &[AssetOutcome],
) -> RunReport {
    let mut scripts = ClassCounts { assets: script_count, ..Default::default() };
    let mut styles = ClassCounts { assets: style_count, ..Default::default() };
    let mut files = WriteSummary::default();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome {
            AssetOutcome::NoMap(_) => {}
            AssetOutcome::Reconstructed { map, summary } => {
                let counts = match map.asset.kind {
                    AssetKind::Script => &mut scripts,
                    AssetKind::Stylesheet => &mut styles,
                };
                counts.maps += 1;
                counts.maps_decoded += 1;
                files.merge(*summary);
            }
            AssetOutcome::Failed { asset, failure } => {
                let counts = match asset.kind {
                    AssetKind::Script => &mut scripts,
                    AssetKind::Stylesheet => &mut styles,
                };
                // The map was declared; it just could not be used.
                if !matches!(failure, AssetFailure::AssetFetch { .. }) {
                    counts.maps += 1;
                }
                failures.push(failure.to_string());
            }
        }
    }

    RunReport {
        page,
        output_directory: config.output_directory.clone(),
        started_at,
        finished_at: Utc::now(),
        scripts,
        styles: config.download_styles.then_some(styles),
        files,
        failures,
    }
}

fn log_report(report: &RunReport) {
    log::info!(
        "{} of {} script map(s) decoded",
        report.scripts.maps_decoded,
        report.scripts.maps
    );
    if let Some(styles) = &report.styles {
        log::info!("{} of {} stylesheet map(s) decoded", styles.maps_decoded, styles.maps);
    }
    log::info!(
        "files written: {}, skipped: {}, rejected: {}, failed: {}",
        report.files.written,
        report.files.skipped,
        report.files.rejected,
        report.files.failed
    );
    // One warning per failed asset, nowhere else.
    if report.is_partial() {
        log::info!("{} asset(s) could not be processed:", report.failures.len());
        for failure in &report.failures {
            log::warn!("{failure}");
        }
    }
    let elapsed = report.finished_at - report.started_at;
    log::info!("finished in {}ms", elapsed.num_milliseconds());
}
