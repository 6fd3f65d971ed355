//! End-to-end archive run: download, reconcile, render, clean up.
//!
//! Only acquisition and writing the page can fail the run. Reconciliation and
//! cleanup log what went wrong and carry on with whatever paths are valid.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::{debug, info, warn};

use crate::cleanup::{CleanupPolicy, remove_files};
use crate::config::DEFAULT_FORMAT;
use crate::download::Downloader;
use crate::naming::derive_slug;
use crate::page::{PageContext, PageRenderer, write_page};
use crate::reconcile::DownloadedFiles;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: String,
    pub standalone: bool,
    pub keep_all: bool,
}

impl ArchiveOptions {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            format: DEFAULT_FORMAT.to_owned(),
            standalone: false,
            keep_all: false,
        }
    }

    pub fn policy(&self) -> CleanupPolicy {
        CleanupPolicy::new(self.standalone, self.keep_all)
    }
}

/// What a run left behind.
#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    pub slug: String,
    /// File set after renaming, including files that cleanup removed.
    pub files: DownloadedFiles,
    pub page: PathBuf,
    pub removed: Vec<PathBuf>,
}

impl ArchiveOutcome {
    /// Video path if it is still on disk.
    pub fn video(&self) -> Option<&Path> {
        let video = self.files.video.as_path();
        (!self.removed.iter().any(|path| path == video)).then_some(video)
    }
}

pub fn archive_video(downloader: &Downloader, options: &ArchiveOptions) -> Result<ArchiveOutcome> {
    archive_video_on(downloader, options, Local::now().date_naive())
}

/// Same as [`archive_video`] with a fixed archive date.
pub fn archive_video_on(
    downloader: &Downloader,
    options: &ArchiveOptions,
    archive_date: NaiveDate,
) -> Result<ArchiveOutcome> {
    let output_dir = options.output_dir.as_path();
    let record = downloader.fetch(&options.url, output_dir, &options.format)?;
    info!("Fetched \"{}\" ({})", record.title_or_placeholder(), record.id);

    let slug = derive_slug(record.title.as_deref(), record.upload_date.as_deref());
    debug!("Derived slug {slug}");

    let files = match DownloadedFiles::locate(output_dir, &record) {
        Some(files) => files.rename_to_slug(&slug),
        None => {
            let expected = DownloadedFiles::expected(output_dir, &record, &options.format);
            warn!(
                "Could not locate the downloaded video in {}; assuming {}",
                output_dir.display(),
                expected.video.display()
            );
            expected
        }
    };

    info!("Creating HTML archive page...");
    let policy = options.policy();
    let context = PageContext::build(&record, &files, &policy, archive_date);
    let html = PageRenderer::new()?.render(&context)?;
    let page = write_page(output_dir, &slug, &html)
        .with_context(|| format!("saving archive page for {}", options.url))?;

    let removed = remove_files(&policy.removal_set(&files, &page, &context.embedded));

    Ok(ArchiveOutcome {
        slug,
        files,
        page,
        removed,
    })
}
