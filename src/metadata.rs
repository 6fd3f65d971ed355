//! Video metadata as reported by yt-dlp.
//!
//! `VideoRecord` mirrors the subset of the `--dump-single-json` payload (and
//! the `.info.json` sidecar, which has the same shape) that the archiver reads.
//! Every field is optional because extractors differ wildly in what they
//! populate, and yt-dlp happily emits `null` for anything it could not find.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Title used when the extractor did not report one.
pub const UNTITLED_PLACEHOLDER: &str = "Untitled Video";
/// Uploader shown when the extractor did not report one.
pub const UNKNOWN_UPLOADER: &str = "Unknown";
/// Container extension assumed when `ext` is missing.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// One entry of yt-dlp's `requested_downloads`, filled in after the download
/// (and any merge step) finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestedDownload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

/// Thumbnail entry. `filepath` is only present for the thumbnail that was
/// actually written to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThumbnailInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

/// Metadata for the single video handled by one invocation.
///
/// Created by acquisition, consumed once to derive the slug and render the
/// archive page, then dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Vec<ThumbnailInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_downloads: Option<Vec<RequestedDownload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, rename = "_filename", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl VideoRecord {
    /// Parses a yt-dlp JSON document. yt-dlp prints `null` when extraction
    /// produced no result, which is treated as a failure.
    pub fn from_json(raw: &str) -> Result<Self> {
        let record: Option<Self> =
            serde_json::from_str(raw.trim()).context("deserializing yt-dlp metadata JSON")?;
        match record {
            Some(record) => Ok(record),
            None => bail!("yt-dlp returned no metadata"),
        }
    }

    /// Reads an `.info.json` sidecar from disk.
    pub fn load_sidecar(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn title_or_placeholder(&self) -> &str {
        non_empty(self.title.as_deref()).unwrap_or(UNTITLED_PLACEHOLDER)
    }

    pub fn uploader_or_unknown(&self) -> &str {
        non_empty(self.uploader.as_deref()).unwrap_or(UNKNOWN_UPLOADER)
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(self.description.as_deref())
    }

    pub fn webpage_url(&self) -> &str {
        self.webpage_url.as_deref().unwrap_or_default()
    }

    /// Declared container extension, defaulting to mp4.
    pub fn extension(&self) -> &str {
        non_empty(self.ext.as_deref()).unwrap_or(DEFAULT_EXTENSION)
    }

    /// Upload date formatted for display, empty when unknown.
    pub fn display_upload_date(&self) -> String {
        format_date(self.upload_date.as_deref().unwrap_or_default())
    }

    /// Final media path as reported by yt-dlp, if any. Post-processing
    /// results in `requested_downloads` win over the pre-merge `_filename`.
    pub fn reported_media_path(&self) -> Option<PathBuf> {
        self.requested_downloads
            .iter()
            .flatten()
            .find_map(|download| non_empty(download.filepath.as_deref()))
            .or_else(|| non_empty(self.filepath.as_deref()))
            .or_else(|| non_empty(self.filename.as_deref()))
            .map(PathBuf::from)
    }

    /// Path of the written thumbnail. yt-dlp only writes the best (last)
    /// entry, so the search runs from the end.
    pub fn reported_thumbnail_path(&self) -> Option<PathBuf> {
        self.thumbnails
            .iter()
            .flatten()
            .rev()
            .find_map(|thumb| non_empty(thumb.filepath.as_deref()))
            .map(PathBuf::from)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Converts yt-dlp's `YYYYMMDD` upload date into `YYYY-MM-DD`. Anything that
/// is not a valid calendar date is returned unchanged.
pub fn format_date(value: &str) -> String {
    parse_upload_date(value)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| value.to_owned())
}

fn parse_upload_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = &value[0..4];
    let month = &value[4..6];
    let day = &value[6..8];
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn format_date_converts_compact_dates() {
        assert_eq!(format_date("20250328"), "2025-03-28");
        assert_eq!(format_date("20240229"), "2024-02-29");
    }

    #[test]
    fn format_date_passes_through_invalid_values() {
        assert_eq!(format_date("invalid"), "invalid");
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("20231301"), "20231301");
        assert_eq!(format_date("2025-03-28"), "2025-03-28");
        assert_eq!(format_date("2025０328"), "2025０328");
    }

    #[test]
    fn from_json_tolerates_nulls_and_missing_fields() -> Result<()> {
        let record = VideoRecord::from_json(
            r#"{"id":"abc","title":null,"uploader":"","ext":null,"thumbnails":null}"#,
        )?;
        assert_eq!(record.id, "abc");
        assert_eq!(record.title_or_placeholder(), UNTITLED_PLACEHOLDER);
        assert_eq!(record.uploader_or_unknown(), UNKNOWN_UPLOADER);
        assert_eq!(record.extension(), "mp4");
        assert!(record.description().is_none());
        assert!(record.reported_media_path().is_none());
        assert!(record.reported_thumbnail_path().is_none());
        Ok(())
    }

    #[test]
    fn from_json_rejects_null_result() {
        let err = VideoRecord::from_json("null\n").unwrap_err();
        assert!(err.to_string().contains("no metadata"));
    }

    #[test]
    fn reported_media_path_prefers_requested_downloads() -> Result<()> {
        let record = VideoRecord::from_json(
            r#"{
                "id": "abc",
                "_filename": "/tmp/pre-merge.f137.mp4",
                "requested_downloads": [{"filepath": null}, {"filepath": "/tmp/final.mp4"}]
            }"#,
        )?;
        assert_eq!(
            record.reported_media_path(),
            Some(PathBuf::from("/tmp/final.mp4"))
        );

        let fallback = VideoRecord::from_json(r#"{"id":"abc","_filename":"/tmp/only.webm"}"#)?;
        assert_eq!(
            fallback.reported_media_path(),
            Some(PathBuf::from("/tmp/only.webm"))
        );
        Ok(())
    }

    #[test]
    fn reported_thumbnail_path_uses_written_entry() -> Result<()> {
        let record = VideoRecord::from_json(
            r#"{"thumbnails":[
                {"url":"https://img/1.jpg"},
                {"url":"https://img/2.webp","filepath":"/tmp/v.webp"},
                {"url":"https://img/3.jpg"}
            ]}"#,
        )?;
        assert_eq!(
            record.reported_thumbnail_path(),
            Some(PathBuf::from("/tmp/v.webp"))
        );
        Ok(())
    }

    #[test]
    fn load_sidecar_reads_info_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("clip.info.json");
        fs::write(
            &path,
            r#"{"id":"xyz","title":"Clip","upload_date":"20240102","ext":"webm"}"#,
        )?;
        let record = VideoRecord::load_sidecar(&path)?;
        assert_eq!(record.id, "xyz");
        assert_eq!(record.extension(), "webm");
        assert_eq!(record.display_upload_date(), "2024-01-02");
        Ok(())
    }
}
