//! Scratch files: local copies of remote documents that live for exactly one
//! iteration of the batch loop.
//!
//! [`ScratchFile`] takes charge of a downloaded file once the download has
//! succeeded and removes it when dropped, so every later exit from the
//! per-candidate step (success, early `return`, `?`, or a panic) deletes it.
//! A failed download never produces a guard: the store cleans up its own
//! partial file, and whatever already sat at that path is left alone.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An owned path in the scratch directory, deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    /// Take charge of the file this run just wrote at `path`.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting any failure other than "not found".
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        remove_if_present(&self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            warn!("Failed to remove scratch file {}: {}", self.path.display(), e);
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed scratch file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
