use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::url_utils::{resolve, Resolution};

/// Class of a linked asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Stylesheet,
}

impl AssetKind {
    /// File extension of assets of this class, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Script => "js",
            AssetKind::Stylesheet => "css",
        }
    }
}

/// An asset discovered on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    pub url: Url,
    pub kind: AssetKind,
}

/// Which asset classes to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetClasses {
    pub scripts: bool,
    pub styles: bool,
}

impl AssetClasses {
    pub fn scripts_only() -> Self {
        Self { scripts: true, styles: false }
    }

    pub fn all() -> Self {
        Self { scripts: true, styles: true }
    }

    pub fn kinds(self) -> Vec<AssetKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.scripts {
            kinds.push(AssetKind::Script);
        }
        if self.styles {
            kinds.push(AssetKind::Stylesheet);
        }
        kinds
    }
}

// Quoted literals made only of URL-safe path characters.
static SCRIPT_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([-./:@A-Za-z0-9_~%+]+\.js)"|'([-./:@A-Za-z0-9_~%+]+\.js)'"#).unwrap()
});

static STYLE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([-./:@A-Za-z0-9_~%+]+\.css)"|'([-./:@A-Za-z0-9_~%+]+\.css)'"#).unwrap()
});

fn literal_re(kind: AssetKind) -> &'static Regex {
    match kind {
        AssetKind::Script => &*SCRIPT_LITERAL_RE,
        AssetKind::Stylesheet => &*STYLE_LITERAL_RE,
    }
}

/// Scan `page` line by line for quoted `.js` (and, when requested, `.css`)
/// literals and resolve them against `base`.
///
/// The result keeps first-occurrence order and holds each URL once. An empty
/// vector is a normal outcome; the caller decides whether it is fatal.
pub fn extract_assets(page: &str, base: &Url, classes: AssetClasses) -> Vec<AssetReference> {
    let kinds = classes.kinds();
    let mut seen: HashSet<Url> = HashSet::new();
    let mut assets = Vec::new();

    for line in page.lines() {
        for &kind in &kinds {
            for caps in literal_re(kind).captures_iter(line) {
                let Some(literal) = caps.get(1).or_else(|| caps.get(2)) else {
                    continue;
                };
                // A literal found on the page is its own origin.
                match resolve(base, base, literal.as_str()) {
                    Resolution::Resolved(url) => {
                        if seen.insert(url.clone()) {
                            assets.push(AssetReference { url, kind });
                        }
                    }
                    Resolution::Opaque(raw) => {
                        log::warn!("ignoring asset link with unsupported scheme: {raw}");
                    }
                }
            }
        }
    }

    assets
}

/// Assets of one class, in discovery order.
pub fn of_kind(assets: &[AssetReference], kind: AssetKind) -> impl Iterator<Item = &AssetReference> {
    assets.iter().filter(move |a| a.kind == kind)
}
