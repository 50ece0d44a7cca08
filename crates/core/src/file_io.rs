use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::path_reconstruct::ReconstructionTarget;
use crate::sm_parse::SourceEntry;

/// Tally of one `write_sources` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub written: usize,
    /// Entries with no embedded content.
    pub skipped: usize,
    /// Entries whose path would leave the output root.
    pub rejected: usize,
    /// Entries that hit a filesystem error.
    pub failed: usize,
}

impl WriteSummary {
    pub fn merge(&mut self, other: WriteSummary) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.rejected += other.rejected;
        self.failed += other.failed;
    }
}

/// Create `dir` and its ancestors. Another worker creating the same
/// directory concurrently is not an error.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Write `bytes` to `dest` through a temporary file in the same directory, so
/// an interrupted run never leaves a truncated file behind.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    // NamedTempFile is created 0600; give the result plain-file permissions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Materialize every entry that carries content under `output_root`.
///
/// Per-entry problems are logged and counted; they never stop the remaining
/// entries. A later entry with the same final path overwrites an earlier one.
pub fn write_sources(output_root: &Path, entries: &[SourceEntry]) -> WriteSummary {
    let mut summary = WriteSummary::default();

    for entry in entries {
        let target = match ReconstructionTarget::from_entry(entry) {
            Ok(Some(t)) => t,
            Ok(None) => {
                log::debug!("no embedded content for {}", entry.logical_path);
                summary.skipped += 1;
                continue;
            }
            Err(violation) => {
                log::warn!("{violation}");
                summary.rejected += 1;
                continue;
            }
        };

        let dest = target.destination(output_root);
        if dest.exists() {
            log::debug!("overwriting {}", dest.display());
        }
        match write_atomic(&dest, target.content.as_bytes()) {
            Ok(()) => {
                log::debug!("wrote {} ({} bytes)", dest.display(), target.content.len());
                summary.written += 1;
            }
            Err(e) => {
                log::warn!("failed to write {}: {e}", dest.display());
                summary.failed += 1;
            }
        }
    }

    summary
}
