//! Specification directory scanning
//!
//! Directories are scanned in the order given; a directory's index in that
//! list is the priority rank of every file found in it. Each file is an
//! independent unit of failure: a file that cannot be read or decoded yields
//! one error record and the scan moves on.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ErrorRecord;
use crate::spec::{RawSpec, SpecFile, SpecFormat};

/// Result of scanning a list of directories
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Decoded files, ordered by priority then file name
    pub specs: Vec<RawSpec>,
    /// Unreadable directories and undecodable files
    pub errors: Vec<ErrorRecord>,
    /// Directories that existed and were listed
    pub scanned_dirs: usize,
    /// Directories that existed but could not be listed
    pub failed_dirs: usize,
}

/// Scan every directory, in order.
///
/// Repeated directories are scanned once at the rank of their first
/// appearance. Missing directories are skipped silently.
pub fn scan_dirs(dirs: &[PathBuf]) -> ScanResult {
    let mut result = ScanResult::default();
    let mut seen: Vec<&Path> = Vec::with_capacity(dirs.len());

    for (priority, dir) in dirs.iter().enumerate() {
        if seen.contains(&dir.as_path()) {
            debug!(dir = %dir.display(), "Skipping repeated spec directory");
            continue;
        }
        seen.push(dir.as_path());

        let files = match list_spec_files(dir) {
            Ok(files) => files,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Spec directory does not exist");
                continue;
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read spec directory");
                result.failed_dirs += 1;
                result.errors.push(ErrorRecord::load(
                    dir.display().to_string(),
                    format!("failed to read directory: {}", e),
                ));
                continue;
            }
        };
        result.scanned_dirs += 1;

        for path in files {
            match load_file(&path, priority) {
                Ok(spec) => result.specs.push(spec),
                Err(record) => {
                    warn!(path = %path.display(), error = %record.message, "Failed to load spec");
                    result.errors.push(record);
                }
            }
        }
    }

    result
}

/// Specification files directly inside `dir`, sorted by path.
///
/// Only regular files (or symlinks to them) with a known extension are
/// returned; subdirectories are not descended into.
pub fn list_spec_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if SpecFormat::from_path(&path).is_none() {
            debug!(path = %path.display(), "Ignoring file with unknown extension");
            continue;
        }
        // metadata() follows symlinks
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!(path = %path.display(), "Ignoring non-file entry"),
            Err(e) => debug!(path = %path.display(), error = %e, "Ignoring dangling entry"),
        }
    }
    files.sort();
    Ok(files)
}

/// Read and decode one file
pub fn load_file(path: &Path, priority: usize) -> Result<RawSpec, ErrorRecord> {
    let file = SpecFile::from_file(path)
        .map_err(|e| ErrorRecord::load(path.display().to_string(), e.to_string()))?;
    Ok(RawSpec {
        path: path.to_path_buf(),
        priority,
        file,
    })
}
