//! HTML archive page rendering.
//!
//! The page is a single Handlebars template rendered with escaping disabled.
//! yt-dlp titles and descriptions often arrive already entity-encoded
//! (`&amp;`) and must reach the page verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use handlebars::Handlebars;
use log::warn;
use mime_guess::MimeGuess;
use serde::Serialize;

use crate::cleanup::CleanupPolicy;
use crate::metadata::VideoRecord;
use crate::reconcile::DownloadedFiles;

const PAGE_TEMPLATE_NAME: &str = "archive_page";
const PAGE_TEMPLATE: &str = include_str!("../templates/archive_page.hbs");
const JSON_MIME: &str = "application/json";

/// Maps a container extension to the `type` attribute of the `<source>` tag.
/// Browsers sniff the stream anyway, so unknown containers default to mp4.
pub fn video_mime_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "video/mp4",
    }
}

/// Encodes `bytes` as a `data:` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Values substituted into the template.
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub title: String,
    pub uploader: String,
    pub upload_date: String,
    pub description: Option<String>,
    pub webpage_url: String,
    pub video_src: String,
    pub video_mimetype: String,
    pub thumbnail_src: Option<String>,
    pub metadata_src: Option<String>,
    pub metadata_filename: Option<String>,
    pub archive_date: String,
    /// Files whose bytes made it into the page. Nothing else may be deleted.
    #[serde(skip)]
    pub embedded: Vec<PathBuf>,
}

impl PageContext {
    /// Builds the context for a reconciled file set. Files that will not
    /// survive cleanup are embedded as data URIs, everything else is linked
    /// by file name relative to the page.
    pub fn build(
        record: &VideoRecord,
        files: &DownloadedFiles,
        policy: &CleanupPolicy,
        archive_date: NaiveDate,
    ) -> Self {
        let embed_video = policy.standalone;
        let embed_sidecars = policy.standalone || !policy.keeps_sidecars();

        let video_extension = files
            .video
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| record.extension().to_owned());
        let video_mimetype = video_mime_type(&video_extension);

        let mut embedded = Vec::new();
        let video_src = asset_source(&files.video, embed_video, video_mimetype, &mut embedded);
        let thumbnail_src = files.thumbnail.as_deref().map(|path| {
            let mime = MimeGuess::from_path(path).first_or_octet_stream();
            asset_source(path, embed_sidecars, mime.essence_str(), &mut embedded)
        });
        let metadata_src = files
            .sidecar
            .as_deref()
            .map(|path| asset_source(path, embed_sidecars, JSON_MIME, &mut embedded));
        let metadata_filename = files
            .sidecar
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());

        Self {
            title: record.title_or_placeholder().to_owned(),
            uploader: record.uploader_or_unknown().to_owned(),
            upload_date: record.display_upload_date(),
            description: record.description().map(str::to_owned),
            webpage_url: record.webpage_url().to_owned(),
            video_src,
            video_mimetype: video_mimetype.to_owned(),
            thumbnail_src,
            metadata_src,
            metadata_filename,
            archive_date: archive_date.format("%Y-%m-%d").to_string(),
            embedded,
        }
    }
}

/// Data URI of the file when `embed` is set and it can be read, otherwise
/// its percent-encoded file name. Embedded paths are pushed onto `embedded`.
fn asset_source(path: &Path, embed: bool, mime: &str, embedded: &mut Vec<PathBuf>) -> String {
    if embed {
        match fs::read(path) {
            Ok(bytes) => {
                embedded.push(path.to_path_buf());
                return data_uri(mime, &bytes);
            }
            Err(err) => warn!(
                "Could not embed {}: {}; linking it instead",
                path.display(),
                err
            ),
        }
    }
    link_to(path)
}

fn link_to(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    urlencoding::encode(&name).into_owned()
}

/// Compiled archive page template.
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)
            .map_err(|err| anyhow!("compiling archive page template: {err}"))?;
        Ok(Self { registry })
    }

    pub fn render(&self, context: &PageContext) -> Result<String> {
        self.registry
            .render(PAGE_TEMPLATE_NAME, context)
            .map_err(|err| anyhow!("rendering archive page: {err}"))
    }
}

/// Writes `<slug>.html` into `output_dir`.
pub fn write_page(output_dir: &Path, slug: &str, html: &str) -> Result<PathBuf> {
    let path = output_dir.join(format!("{slug}.html"));
    fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> VideoRecord {
        VideoRecord {
            id: "abc".into(),
            title: Some("Test Video with &amp; symbol".into()),
            uploader: Some("Test Uploader".into()),
            upload_date: Some("20250328".into()),
            description: Some(
                "This is a description with &amp; and other &lt;special&gt; characters".into(),
            ),
            webpage_url: Some(
                "https://example.com/video?param1=value1&amp;param2=value2".into(),
            ),
            ext: Some("mp4".into()),
            ..VideoRecord::default()
        }
    }

    fn archive_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    fn extract_data_uri<'a>(html: &'a str, prefix: &str) -> Option<&'a str> {
        let start = html.find(prefix)? + prefix.len();
        let end = html[start..].find('"')? + start;
        Some(&html[start..end])
    }

    #[test]
    fn video_mime_type_covers_known_and_unknown() {
        assert_eq!(video_mime_type("mp4"), "video/mp4");
        assert_eq!(video_mime_type("webm"), "video/webm");
        assert_eq!(video_mime_type("MOV"), "video/quicktime");
        assert_eq!(video_mime_type("mkv"), "video/x-matroska");
        assert_eq!(video_mime_type("unknown"), "video/mp4");
    }

    #[test]
    fn rendered_page_does_not_double_escape() -> Result<()> {
        let dir = tempdir()?;
        let files = DownloadedFiles {
            video: dir.path().join("test-video-with-amp-symbol-0328.mp4"),
            sidecar: None,
            thumbnail: None,
        };
        let context = PageContext::build(
            &sample_record(),
            &files,
            &CleanupPolicy::default(),
            archive_date(),
        );
        let html = PageRenderer::new()?.render(&context)?;

        assert!(html.contains("<title>Test Video with &amp; symbol</title>"));
        assert!(html.contains(
            "This is a description with &amp; and other &lt;special&gt; characters"
        ));
        assert!(html.contains("https://example.com/video?param1=value1&amp;param2=value2"));
        assert!(!html.contains("&amp;amp;"));
        assert!(html.contains("<strong>Published:</strong> 2025-03-28"));
        assert!(html.contains("saved on 2025-04-01"));
        assert!(html.contains(r#"src="test-video-with-amp-symbol-0328.mp4""#));
        Ok(())
    }

    #[test]
    fn missing_fields_use_placeholders_and_hide_description() -> Result<()> {
        let files = DownloadedFiles {
            video: PathBuf::from("/out/clip.webm"),
            sidecar: None,
            thumbnail: None,
        };
        let context = PageContext::build(
            &VideoRecord::default(),
            &files,
            &CleanupPolicy::default(),
            archive_date(),
        );
        let html = PageRenderer::new()?.render(&context)?;
        assert!(html.contains("<h1>Untitled Video</h1>"));
        assert!(html.contains("<strong>Creator:</strong> Unknown"));
        assert!(html.contains(r#"type="video/webm""#));
        assert!(!html.contains("Description:"));
        assert!(!html.contains("poster="));
        Ok(())
    }

    #[test]
    fn standalone_page_embeds_video_and_metadata() -> Result<()> {
        let dir = tempdir()?;
        let video = dir.path().join("clip.mp4");
        let sidecar = dir.path().join("clip.info.json");
        let thumbnail = dir.path().join("clip.webp");
        let json = r#"{"id":"abc","title":"Test Video with &amp; symbol"}"#;
        fs::write(&video, b"\x00\x00\x00\x18ftypmp42")?;
        fs::write(&sidecar, json)?;
        fs::write(&thumbnail, b"RIFF0000WEBP")?;
        let files = DownloadedFiles {
            video,
            sidecar: Some(sidecar),
            thumbnail: Some(thumbnail),
        };

        let context = PageContext::build(
            &sample_record(),
            &files,
            &CleanupPolicy::new(true, false),
            archive_date(),
        );
        let html = PageRenderer::new()?.render(&context)?;

        let video_blob =
            extract_data_uri(&html, "data:video/mp4;base64,").expect("video data URI");
        assert_eq!(STANDARD.decode(video_blob)?, b"\x00\x00\x00\x18ftypmp42");
        let json_blob =
            extract_data_uri(&html, "data:application/json;base64,").expect("metadata data URI");
        assert_eq!(STANDARD.decode(json_blob)?, json.as_bytes());
        assert!(html.contains(r#"poster="data:image/webp;base64,"#));
        assert!(html.contains(r#"download="clip.info.json""#));
        assert_eq!(context.embedded.len(), 3);
        Ok(())
    }

    #[test]
    fn keep_all_links_every_file() -> Result<()> {
        let dir = tempdir()?;
        let files = DownloadedFiles {
            video: dir.path().join("my clip #1.mp4"),
            sidecar: Some(dir.path().join("my clip #1.info.json")),
            thumbnail: Some(dir.path().join("my clip #1.jpg")),
        };
        let context = PageContext::build(
            &sample_record(),
            &files,
            &CleanupPolicy::new(false, true),
            archive_date(),
        );
        assert_eq!(context.video_src, "my%20clip%20%231.mp4");
        assert_eq!(
            context.metadata_src.as_deref(),
            Some("my%20clip%20%231.info.json")
        );
        assert_eq!(
            context.thumbnail_src.as_deref(),
            Some("my%20clip%20%231.jpg")
        );
        assert!(context.embedded.is_empty());
        Ok(())
    }

    #[test]
    fn unreadable_asset_falls_back_to_link() {
        let files = DownloadedFiles {
            video: PathBuf::from("/nonexistent/clip.mp4"),
            sidecar: Some(PathBuf::from("/nonexistent/clip.info.json")),
            thumbnail: None,
        };
        let context = PageContext::build(
            &sample_record(),
            &files,
            &CleanupPolicy::new(true, false),
            archive_date(),
        );
        assert_eq!(context.video_src, "clip.mp4");
        assert_eq!(context.metadata_src.as_deref(), Some("clip.info.json"));
        assert!(context.embedded.is_empty());
    }

    #[test]
    fn only_embedded_assets_are_scheduled_for_removal() -> Result<()> {
        let dir = tempdir()?;
        let sidecar = dir.path().join("clip.info.json");
        fs::write(&sidecar, "{}")?;
        let files = DownloadedFiles {
            // Not on disk, so embedding it fails and the page links it.
            video: dir.path().join("clip.mp4"),
            sidecar: Some(sidecar.clone()),
            thumbnail: None,
        };
        let policy = CleanupPolicy::new(true, false);
        let context = PageContext::build(&sample_record(), &files, &policy, archive_date());

        assert_eq!(context.video_src, "clip.mp4");
        let page = dir.path().join("clip.html");
        let set = policy.removal_set(&files, &page, &context.embedded);
        assert_eq!(set, vec![sidecar]);
        Ok(())
    }

    #[test]
    fn write_page_uses_slug_name() -> Result<()> {
        let dir = tempdir()?;
        let path = write_page(dir.path(), "some-slug", "<html></html>")?;
        assert_eq!(path, dir.path().join("some-slug.html"));
        assert_eq!(fs::read_to_string(path)?, "<html></html>");
        Ok(())
    }
}
