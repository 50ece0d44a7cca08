use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::assets::AssetClasses;
use crate::fetch::DEFAULT_USER_AGENT;

/// Settings for one run, passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct Config {
    /// Also follow stylesheets and their maps.
    pub download_styles: bool,
    pub output_directory: PathBuf,
    /// Report every discovered asset and map at info level.
    pub verbose: bool,
    /// Upper bound on assets processed at once.
    pub concurrency: usize,
    /// Total attempts per request, including the first.
    pub retry_attempts: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Config {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            download_styles: false,
            output_directory: output_directory.into(),
            verbose: false,
            concurrency: 8,
            retry_attempts: 3,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn asset_classes(&self) -> AssetClasses {
        if self.download_styles {
            AssetClasses::all()
        } else {
            AssetClasses::scripts_only()
        }
    }
}

/// `src_<host>` (with `_<port>` when the URL names one) for runs that do not
/// pick an output directory.
pub fn default_output_dir(url: &Url) -> PathBuf {
    let host = url.host_str().unwrap_or("site");
    match url.port() {
        Some(port) => PathBuf::from(format!("src_{host}_{port}")),
        None => PathBuf::from(format!("src_{host}")),
    }
}
