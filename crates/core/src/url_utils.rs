use url::Url;

/// Outcome of resolving a raw path found in a page or asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A fully absolute URL that may be dereferenced.
    Resolved(Url),
    /// A string that cannot be turned into an http(s) URL, such as one with
    /// an unknown `scheme://`. Returned unchanged; callers should warn and
    /// skip it.
    Opaque(String),
}

fn has_http_scheme(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve `raw` into an absolute URL.
///
/// * `http://` / `https://` paths are returned unchanged.
/// * `//host/path` inherits the scheme of `origin_asset`.
/// * `/path` is joined with the scheme, host and port of `origin_asset`.
/// * anything else is joined against the directory of `origin_asset`.
///
/// `base_page` never takes part in the join: an asset served from another
/// origin is resolved against its own origin. It is only consulted to tell
/// same-origin from cross-origin resolutions apart in the logs.
pub fn resolve(base_page: &Url, origin_asset: &Url, raw: &str) -> Resolution {
    let raw = raw.trim();

    if has_http_scheme(raw) {
        return match Url::parse(raw) {
            Ok(u) => Resolution::Resolved(u),
            Err(_) => Resolution::Opaque(raw.to_string()),
        };
    }

    if raw.contains("://") {
        return Resolution::Opaque(raw.to_string());
    }

    if let Some(rest) = raw.strip_prefix("//") {
        return match Url::parse(&format!("{}://{}", origin_asset.scheme(), rest)) {
            Ok(u) => Resolution::Resolved(u),
            Err(_) => Resolution::Opaque(raw.to_string()),
        };
    }

    // Url::join strips the last path segment for relative input and keeps only
    // the origin for root-relative input, collapsing `./` and `../` on the way.
    // It also reads `name:rest` as a URL of its own; such input is a path
    // segment here, so it is joined again behind `./`.
    let joined = match origin_asset.join(raw) {
        Ok(u) if u.scheme() != origin_asset.scheme() => origin_asset.join(&format!("./{raw}")),
        other => other,
    };
    match joined {
        Ok(u) if !matches!(u.scheme(), "http" | "https") => Resolution::Opaque(raw.to_string()),
        Ok(u) => {
            if !same_origin(base_page, origin_asset) {
                log::debug!("resolved {raw} against cross-origin asset {origin_asset}");
            }
            Resolution::Resolved(u)
        }
        Err(_) => Resolution::Opaque(raw.to_string()),
    }
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
