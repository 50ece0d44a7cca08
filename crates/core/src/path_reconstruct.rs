use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sm_parse::SourceEntry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("refusing to reconstruct {logical_path:?}: {reason}")]
pub struct PathSafetyViolation {
    pub logical_path: String,
    pub reason: &'static str,
}

/// A source entry bound to its place under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionTarget {
    /// Always relative, never containing `..`.
    pub relative_path: PathBuf,
    pub content: String,
}

impl ReconstructionTarget {
    /// Plan the write for `entry`. `Ok(None)` means the map carries no
    /// content for it.
    pub fn from_entry(entry: &SourceEntry) -> Result<Option<Self>, PathSafetyViolation> {
        let Some(content) = &entry.content else {
            return Ok(None);
        };
        let relative_path = sanitize_logical_path(&entry.logical_path)?;
        Ok(Some(Self { relative_path, content: content.clone() }))
    }

    pub fn destination(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.relative_path)
    }
}

/// Drop a leading `scheme://authority`, keeping only the path part.
///
/// `webpack:///./src/a.js` -> `/./src/a.js`,
/// `webpack://my-app/./src/a.js` -> `/./src/a.js`,
/// `file:///home/me/a.js` -> `/home/me/a.js`.
fn strip_scheme_and_authority(logical: &str) -> &str {
    let Some(idx) = logical.find("://") else {
        return logical;
    };
    let scheme = &logical[..idx];
    let is_scheme = !scheme.is_empty()
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !is_scheme {
        return logical;
    }
    let rest = &logical[idx + 3..];
    match rest.find('/') {
        Some(slash) => &rest[slash..],
        None => "",
    }
}

/// Turn a logical path from `sources` into a relative filesystem path that
/// cannot leave the output root.
///
/// Scheme and authority are removed, `.` and empty segments collapse, and
/// `..` pops a previous segment. A `..` with nothing left to pop is a
/// violation, as is a path that normalizes to nothing.
pub fn sanitize_logical_path(logical: &str) -> Result<PathBuf, PathSafetyViolation> {
    let violation = |reason| PathSafetyViolation { logical_path: logical.to_string(), reason };

    if logical.contains('\0') {
        return Err(violation("contains a NUL byte"));
    }

    let path = strip_scheme_and_authority(logical);
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(|c: char| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(violation("escapes the output directory"));
                }
            }
            // Windows drive prefixes would make the joined path absolute.
            s if s.len() == 2 && s.ends_with(':') && parts.is_empty() => {}
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        return Err(violation("has no file name"));
    }
    Ok(parts.into_iter().collect())
}
