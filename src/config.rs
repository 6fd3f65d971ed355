use anyhow::{Context, Result};
use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

/// Environment variables that override the output directory, in priority
/// order.
pub const OUTPUT_DIR_ENV_VARS: [&str; 2] = ["XDG_VIDEOS_DIR", "SUMVIDEO_DIR"];
pub const DEFAULT_OUTPUT_SUBDIR: &str = "videos";
pub const DEFAULT_FORMAT: &str = "mp4";

/// Resolves the output directory from the process environment and creates
/// it.
pub fn resolve_output_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("Failed to determine current directory")?;
    let dir = resolve_output_dir_from(explicit, |key| env::var_os(key), &cwd);
    prepare_output_dir(&dir)?;
    Ok(dir)
}

/// An explicit directory wins, then the first non-empty variable of
/// `OUTPUT_DIR_ENV_VARS`, then `<cwd>/videos`.
pub fn resolve_output_dir_from<F>(explicit: Option<PathBuf>, lookup: F, cwd: &Path) -> PathBuf
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(dir) = explicit {
        return dir;
    }
    OUTPUT_DIR_ENV_VARS
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join(DEFAULT_OUTPUT_SUBDIR))
}

pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}
