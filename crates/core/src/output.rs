use std::path::{Path, PathBuf};
use std::fs;
use std::io::{self, ErrorKind};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputDirError {
    #[error("output directory '{0}' is not empty")]
    NotEmpty(PathBuf),
    #[error("output path '{0}' exists but is not a directory")]
    NotADirectory(PathBuf),
    #[error("output directory '{path}' is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check that `output_path` is either absent or an empty directory.
pub fn validate_output_dir<P: AsRef<Path>>(output_path: P) -> Result<(), OutputDirError> {
    let path = output_path.as_ref();
    match fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => Err(OutputDirError::NotADirectory(path.to_path_buf())),
        Ok(_) => {
            let mut listing = fs::read_dir(path).map_err(|source| OutputDirError::Unwritable {
                path: path.to_path_buf(),
                source,
            })?;
            if listing.next().is_some() {
                return Err(OutputDirError::NotEmpty(path.to_path_buf()));
            }
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(OutputDirError::Unwritable { path: path.to_path_buf(), source }),
    }
}

/// Ensure the given output directory exists. Creates missing parent directories as needed.
///
/// Returns Ok(()) if the directory already exists (and is a directory) or is successfully created.
/// Returns an io::Error if creation fails or if a non-directory entity exists at the path.
pub fn ensure_output_dir<P: AsRef<Path>>(output_path: P) -> io::Result<()> {
    let path = output_path.as_ref();
    if path.exists() {
        if !path.is_dir() {
            return Err(io::Error::new(ErrorKind::AlreadyExists, "Output path exists but is not a directory"));
        }
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Create the output root and prove a file can be written inside it.
pub fn prepare_output_root<P: AsRef<Path>>(output_path: P) -> Result<(), OutputDirError> {
    let path = output_path.as_ref();
    let unwritable = |source| OutputDirError::Unwritable { path: path.to_path_buf(), source };
    ensure_output_dir(path).map_err(unwritable)?;
    // The anonymous temp file is removed as soon as it is dropped.
    tempfile::tempfile_in(path).map_err(unwritable)?;
    Ok(())
}
