use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::fetch::{FetchError, Fetcher};

#[derive(Error, Debug)]
pub enum SourcemapError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("source map has no `sources` array")]
    MissingSources,
}

/// A decode problem tied to the map it came from.
#[derive(Error, Debug)]
#[error("could not decode source map {url}: {reason}")]
pub struct DecodeFailure {
    pub url: Url,
    pub reason: SourcemapError,
}

/// Either half of fetch-and-decode can fail.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("failed to fetch source map {url}: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Decode(#[from] DecodeFailure),
}

/// One original file recorded in a source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Path as written in `sources`, e.g. `webpack:///./src/app.js`.
    pub logical_path: String,
    /// Embedded original text; `None` when `sourcesContent` omits it.
    pub content: Option<String>,
}

// Only the fields needed for reconstruction. Array members are kept as raw
// values so one odd entry does not sink the whole map.
#[derive(Deserialize)]
struct RawSourceMap {
    sources: Option<Vec<Value>>,
    #[serde(rename = "sourcesContent", default)]
    sources_content: Option<Vec<Value>>,
    #[serde(rename = "sourceRoot", default)]
    source_root: Option<String>,
}

const XSSI_PREFIX: &str = ")]}'";

fn has_scheme(path: &str) -> bool {
    match path.find("://") {
        Some(idx) => path[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        None => false,
    }
}

fn apply_source_root(root: &str, source: &str) -> String {
    if root.is_empty() || has_scheme(source) || source.starts_with('/') {
        return source.to_string();
    }
    if root.ends_with('/') {
        format!("{root}{source}")
    } else {
        format!("{root}/{source}")
    }
}

/// Decode a source map payload into its `(logical path, content)` entries.
///
/// `sourcesContent` may be missing, shorter than `sources`, or hold nulls;
/// all of those yield entries with no content.
pub fn decode_sourcemap(json: &str) -> Result<Vec<SourceEntry>, SourcemapError> {
    let body = json.trim_start_matches('\u{feff}');
    let body = body.strip_prefix(XSSI_PREFIX).unwrap_or(body);

    let raw: RawSourceMap = serde_json::from_str(body)?;
    let sources = raw.sources.ok_or(SourcemapError::MissingSources)?;
    let contents = raw.sources_content.unwrap_or_default();
    let root = raw.source_root.unwrap_or_default();

    let mut entries = Vec::with_capacity(sources.len());
    for (idx, source) in sources.iter().enumerate() {
        let Some(path) = source.as_str() else {
            log::debug!("skipping non-string sources[{idx}]");
            continue;
        };
        let content = contents
            .get(idx)
            .and_then(Value::as_str)
            .map(str::to_string);
        entries.push(SourceEntry {
            logical_path: apply_source_root(&root, path),
            content,
        });
    }
    Ok(entries)
}

/// Convenience helper: the logical paths listed by a map, in order.
pub fn sources_list(entries: &[SourceEntry]) -> Vec<String> {
    entries.iter().map(|e| e.logical_path.clone()).collect()
}

/// Fetch `url` and decode the body as a source map.
pub async fn fetch_and_decode(fetcher: &dyn Fetcher, url: &Url) -> Result<Vec<SourceEntry>, MapError> {
    let body = fetcher
        .fetch_text(url)
        .await
        .map_err(|source| MapError::Fetch { url: url.clone(), source })?;
    decode_sourcemap(&body).map_err(|reason| {
        MapError::Decode(DecodeFailure { url: url.clone(), reason })
    })
}
