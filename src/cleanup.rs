//! Removal of intermediate files once the archive page exists.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::reconcile::DownloadedFiles;

/// Which downloaded files survive a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// The video is embedded in the page, so the file itself is redundant.
    pub standalone: bool,
    /// Keep every file regardless of mode.
    pub keep_all: bool,
}

impl CleanupPolicy {
    pub fn new(standalone: bool, keep_all: bool) -> Self {
        Self {
            standalone,
            keep_all,
        }
    }

    /// Whether the sidecar and thumbnail remain on disk after the run.
    pub fn keeps_sidecars(&self) -> bool {
        self.keep_all
    }

    /// Files to delete. The page is never part of the set, and neither is a
    /// file missing from `embedded`: the page links it, so it has to stay.
    pub fn removal_set(
        &self,
        files: &DownloadedFiles,
        page: &Path,
        embedded: &[PathBuf],
    ) -> Vec<PathBuf> {
        if self.keep_all {
            return Vec::new();
        }

        let mut paths = Vec::new();
        if self.standalone {
            paths.push(files.video.clone());
        }
        paths.extend(files.sidecar.iter().cloned());
        paths.extend(files.thumbnail.iter().cloned());
        paths.retain(|path| path != page);
        paths.retain(|path| {
            let keep = embedded.contains(path);
            if !keep {
                warn!("Keeping {} because it was not embedded", path.display());
            }
            keep
        });
        paths
    }
}

/// Deletes each path independently and returns the ones actually removed.
pub fn remove_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed {}", path.display());
                removed.push(path.clone());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Nothing to remove at {}", path.display());
            }
            Err(err) => {
                warn!("Could not remove {}: {}", path.display(), err);
            }
        }
    }
    removed
}
