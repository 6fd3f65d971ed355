//! Acquisition through the external `yt-dlp` program.
//!
//! One invocation downloads the media, writes the `.info.json` sidecar and
//! the thumbnail next to it, and prints the final info dict on stdout
//! (`--dump-single-json --no-simulate`), which is parsed into a
//! [`VideoRecord`].

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};

use crate::metadata::VideoRecord;

pub const DEFAULT_PROGRAM: &str = "yt-dlp";
/// yt-dlp output template; reconciliation renames the result afterwards.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Prefers a `format` video stream merged with m4a audio, then any single
/// `format` file, then whatever is best.
pub fn format_selector(format: &str) -> String {
    format!("bestvideo[ext={format}]+bestaudio[ext=m4a]/best[ext={format}]/best")
}

#[derive(Debug, Clone)]
pub struct Downloader {
    program: PathBuf,
    verbose: bool,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl Downloader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            verbose: false,
        }
    }

    /// Lets yt-dlp warnings through to stderr.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub fn ensure_available(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => bail!(
                "{} is installed but returned a failure status",
                self.program.display()
            ),
            Err(err) => bail!(
                "{} is not installed or not in PATH: {}",
                self.program.display(),
                err
            ),
        }
    }

    /// Downloads `url` into `output_dir` and returns the reported metadata.
    /// Any failure here is fatal for the run.
    pub fn fetch(&self, url: &str, output_dir: &Path, format: &str) -> Result<VideoRecord> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;

        let mut command = self.command(url, output_dir, format);
        info!("Downloading video from {url}...");
        debug!("Running {:?}", command);

        let output = command
            .output()
            .with_context(|| format!("running {} for {}", self.program.display(), url))?;

        if !output.status.success() {
            bail!("download failed for {} (status {})", url, output.status);
        }

        let stdout =
            String::from_utf8(output.stdout).context("parsing yt-dlp output as UTF-8")?;
        let json = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| anyhow!("yt-dlp printed no metadata for {url}"))?;

        VideoRecord::from_json(json)
            .with_context(|| format!("could not extract information from {url}"))
    }

    fn command(&self, url: &str, output_dir: &Path, format: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--format")
            .arg(format_selector(format))
            .arg("--paths")
            .arg(format!("home:{}", output_dir.display()))
            .arg("--output")
            .arg(OUTPUT_TEMPLATE)
            .arg("--write-info-json")
            .arg("--write-thumbnail")
            .arg("--keep-video")
            .arg("--dump-single-json")
            .arg("--no-simulate")
            .arg("--no-progress");

        if !self.verbose {
            command.arg("--no-warnings");
        }

        command.arg(url).stderr(Stdio::inherit());
        command
    }
}

/// Writes a bash stand-in for yt-dlp into `dir`. It mimics the real tool's
/// side effects: files named after the unsanitized title plus the info dict
/// on stdout. URLs containing `fail` exit non-zero, URLs containing `null`
/// print `null`.
#[cfg(all(test, unix))]
pub(crate) fn install_ytdlp_stub(dir: &Path) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let script_path = dir.join("yt-dlp");
    let script = r#"#!/usr/bin/env bash
set -euo pipefail
if [[ "${1:-}" == "--version" ]]; then
    echo "2025.01.01"
    exit 0
fi
prev=""
home="."
url=""
for arg in "$@"; do
    if [[ "$prev" == "--paths" ]]; then
        home="${arg#home:}"
    fi
    prev="$arg"
    url="$arg"
done
if [[ "$url" == *fail* ]]; then
    echo "ERROR: Unsupported URL: $url" >&2
    exit 1
fi
if [[ "$url" == *null* ]]; then
    echo "null"
    exit 0
fi
base="$home/Stub Video &amp; Friends"
printf 'video-bytes' > "$base.mp4"
printf 'thumb-bytes' > "$base.webp"
printf '%s' '{"id":"stub123","title":"Stub Video &amp; Friends","upload_date":"20250328"}' > "$base.info.json"
cat <<JSON
{"id":"stub123","title":"Stub Video &amp; Friends","uploader":"Stub Channel","upload_date":"20250328","description":"Line one &lt;b&gt;","webpage_url":"$url","ext":"mp4","requested_downloads":[{"filepath":"$base.mp4","ext":"mp4"}],"thumbnails":[{"url":"https://img.example/1.webp","filepath":"$base.webp"}]}
JSON
"#;
    fs::write(&script_path, script)?;
    let mut perms = fs::metadata(&script_path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script_path, perms)?;
    Ok(script_path)
}
