//! Matches the files yt-dlp produced to the record and renames them to the
//! slug.
//!
//! yt-dlp names its output after the title template and sanitizes it on its
//! own terms, so the names on disk cannot be predicted from the record. The
//! video is the anchor: the sidecar and thumbnail are found next to it by
//! sharing its base name.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::metadata::VideoRecord;

pub const SIDECAR_SUFFIX: &str = ".info.json";
/// Image extensions yt-dlp writes thumbnails with, in lookup order.
pub const THUMBNAIL_EXTENSIONS: [&str; 4] = ["webp", "jpg", "jpeg", "png"];

/// The on-disk file set of one download, correlated by base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFiles {
    pub video: PathBuf,
    pub sidecar: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
}

impl DownloadedFiles {
    /// Finds the video, then its sidecar and thumbnail. Returns `None` when no
    /// video file can be located.
    pub fn locate(output_dir: &Path, record: &VideoRecord) -> Option<Self> {
        let video = locate_video(output_dir, record)?;
        let sidecar = locate_sidecar(&video);
        let thumbnail = locate_thumbnail(&video, output_dir, record);
        Some(Self {
            video,
            sidecar,
            thumbnail,
        })
    }

    /// Best-available file set when nothing could be located: the name the
    /// download template would have produced.
    pub fn expected(output_dir: &Path, record: &VideoRecord, format: &str) -> Self {
        let video = output_dir.join(format!("{}.{}", record.title_or_placeholder(), format));
        Self {
            video,
            sidecar: None,
            thumbnail: None,
        }
    }

    /// Renames every file to `<slug>.<ext>`. Failures are logged and leave the
    /// original path in place.
    pub fn rename_to_slug(self, slug: &str) -> Self {
        let video = rename_with_suffix(&self.video, slug, &video_suffix(&self.video));
        let sidecar = self
            .sidecar
            .map(|path| rename_with_suffix(&path, slug, SIDECAR_SUFFIX));
        let thumbnail = self.thumbnail.map(|path| {
            let suffix = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            rename_with_suffix(&path, slug, &suffix)
        });
        Self {
            video,
            sidecar,
            thumbnail,
        }
    }
}

/// Prefers the path yt-dlp reported; falls back to scanning the directory.
pub fn locate_video(output_dir: &Path, record: &VideoRecord) -> Option<PathBuf> {
    if let Some(reported) = record.reported_media_path() {
        let reported = resolve(output_dir, reported);
        if reported.is_file() {
            debug!("Using reported media path {}", reported.display());
            return Some(reported);
        }
        debug!(
            "Reported media path {} does not exist, scanning {}",
            reported.display(),
            output_dir.display()
        );
    }
    scan_for_video(output_dir, record)
}

/// Scans the top level of `output_dir` for `*.<ext>` files. Candidates are
/// taken in file-name order; one whose sidecar carries the record's id wins
/// over the rest.
fn scan_for_video(output_dir: &Path, record: &VideoRecord) -> Option<PathBuf> {
    let wanted = format!(".{}", record.extension());
    let mut candidates: Vec<PathBuf> = WalkDir::new(output_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.ends_with(&wanted) && !name.ends_with(SIDECAR_SUFFIX)
        })
        .map(|entry| entry.into_path())
        .collect();

    if candidates.len() > 1 && !record.id.is_empty() {
        if let Some(index) = candidates
            .iter()
            .position(|candidate| sidecar_matches_id(candidate, &record.id))
        {
            return Some(candidates.swap_remove(index));
        }
        warn!(
            "{} candidate files end in {}, none linked to id {}; taking {}",
            candidates.len(),
            wanted,
            record.id,
            candidates[0].display()
        );
    }

    candidates.into_iter().next()
}

fn sidecar_matches_id(video: &Path, id: &str) -> bool {
    locate_sidecar(video)
        .and_then(|path| VideoRecord::load_sidecar(&path).ok())
        .is_some_and(|sidecar| sidecar.id == id)
}

/// `<stem>.info.json` next to the video, if present.
pub fn locate_sidecar(video: &Path) -> Option<PathBuf> {
    let path = sibling_with_suffix(video, SIDECAR_SUFFIX)?;
    path.is_file().then_some(path)
}

/// The thumbnail yt-dlp reported, else the first `<stem>.<image ext>` found.
pub fn locate_thumbnail(video: &Path, output_dir: &Path, record: &VideoRecord) -> Option<PathBuf> {
    if let Some(reported) = record.reported_thumbnail_path() {
        let reported = resolve(output_dir, reported);
        if reported.is_file() {
            return Some(reported);
        }
    }
    THUMBNAIL_EXTENSIONS.iter().find_map(|ext| {
        let path = sibling_with_suffix(video, &format!(".{ext}"))?;
        path.is_file().then_some(path)
    })
}

fn resolve(output_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        output_dir.join(path)
    }
}

fn sibling_with_suffix(video: &Path, suffix: &str) -> Option<PathBuf> {
    let stem = video.file_stem()?.to_string_lossy();
    Some(video.with_file_name(format!("{stem}{suffix}")))
}

fn video_suffix(video: &Path) -> String {
    video
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Renames `path` to `<slug><suffix>` in the same directory and returns
/// whichever path is valid afterwards.
fn rename_with_suffix(path: &Path, slug: &str, suffix: &str) -> PathBuf {
    let target = path.with_file_name(format!("{slug}{suffix}"));
    if target == *path {
        return target;
    }
    match fs::rename(path, &target) {
        Ok(()) => {
            debug!("Renamed {} -> {}", path.display(), target.display());
            target
        }
        Err(err) => {
            warn!(
                "Could not rename {} to {}: {}",
                path.display(),
                target.display(),
                err
            );
            path.to_path_buf()
        }
    }
}
