use regex::Regex;
use once_cell::sync::Lazy;
use serde::Serialize;
use url::Url;

use crate::assets::AssetReference;

static SOURCE_MAP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?://[#@][ \t]*sourceMappingURL=(\S+)|/\*[#@][ \t]*sourceMappingURL=([^\s*]+)[ \t]*\*/)").unwrap()
});

/// A source map declared by an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapReference {
    pub asset: AssetReference,
    /// Text captured after `sourceMappingURL=`.
    pub raw_path: String,
    pub resolved: Url,
}

/// Find the source map path declared by an asset.
///
/// Accepts `//# sourceMappingURL=`, the legacy `//@` form and the
/// `/*# ... */` block comment used by stylesheets, each at the start of its
/// own line. Only paths ending in `.<extension>.map` are considered, and the
/// last such directive wins.
pub fn locate_sourcemap(asset_text: &str, extension: &str) -> Option<String> {
    let suffix = format!(".{extension}.map");
    SOURCE_MAP_RE
        .captures_iter(asset_text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|path| path.ends_with(&suffix))
        .last()
        .map(str::to_string)
}
