#![forbid(unsafe_code)]

//! Downloads one video and writes an HTML archive page next to it.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, error};
use sumvideo_tools::archive::{ArchiveOptions, archive_video};
use sumvideo_tools::config::{DEFAULT_FORMAT, resolve_output_dir};
use sumvideo_tools::download::{DEFAULT_PROGRAM, Downloader};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Download a video and create an HTML description page."
)]
struct Cli {
    #[arg(value_name = "URL", help = "URL of the video to download")]
    url: String,
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "PATH",
        help = "Directory to save the video and HTML files (default $XDG_VIDEOS_DIR, $SUMVIDEO_DIR or ./videos)"
    )]
    output_dir: Option<PathBuf>,
    #[arg(
        short = 'f',
        long = "format",
        value_name = "EXT",
        default_value = DEFAULT_FORMAT,
        help = "Video format to download (mp4, webm, etc.)"
    )]
    format: String,
    #[arg(
        short = 's',
        long = "standalone",
        help = "Embed the video, metadata and thumbnail in the HTML page"
    )]
    standalone: bool,
    #[arg(
        short = 'k',
        long = "keep-all",
        help = "Keep the JSON metadata and thumbnail files"
    )]
    keep_all: bool,
    #[arg(short = 'v', long = "verbose", help = "Enable debug logging")]
    verbose: bool,
    #[arg(long = "yt-dlp", value_name = "PATH", default_value = DEFAULT_PROGRAM, help = "yt-dlp executable to run")]
    yt_dlp: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        error!("{err:#}");
        eprintln!("Archiving failed. Exiting.");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let downloader = Downloader::new(cli.yt_dlp).verbose(cli.verbose);
    downloader.ensure_available()?;

    let output_dir = resolve_output_dir(cli.output_dir)?;
    let mut options = ArchiveOptions::new(cli.url, output_dir);
    options.format = cli.format;
    options.standalone = cli.standalone;
    options.keep_all = cli.keep_all;

    let outcome = archive_video(&downloader, &options)?;

    println!();
    println!("Done!");
    match outcome.video() {
        Some(video) => println!("Video saved to: {}", video.display()),
        None => println!("Video embedded in the HTML page"),
    }
    println!("HTML page saved to: {}", outcome.page.display());
    println!("You can open the HTML page in your browser to view the video and its metadata.");

    Ok(())
}

/// `info` by default, `debug` with `--verbose`. `RUST_LOG` directives are
/// applied on top.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
