//! Command-line flags and the fixed download settings

use clap::Parser;
use std::path::PathBuf;

use crate::extractor::DownloadRequest;

/// Folder, relative to the working directory, that receives every download
pub const DOWNLOAD_DIR_NAME: &str = "Downloads";

/// Prefer separate best video + best audio, fall back to the best single file
pub const FORMAT_SELECTION: &str = "bestvideo*+bestaudio/best";

/// Container the separate streams are merged into
pub const MERGE_FORMAT: &str = "mp4";

#[derive(Parser, Debug)]
#[command(name = "yt-grab", version, about = "Analyze and download a single video with yt-dlp")]
pub struct Cli {
    /// Path to the yt-dlp executable (default: search PATH)
    #[arg(long = "yt-dlp", value_name = "PATH")]
    pub ytdlp: Option<PathBuf>,

    /// Log extractor output at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runtime configuration assembled at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ytdlp: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub verbose: bool,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            ytdlp: cli.ytdlp,
            output_dir: cwd.join(DOWNLOAD_DIR_NAME),
            verbose: cli.verbose,
        }
    }

    pub fn download_request(&self) -> DownloadRequest {
        DownloadRequest {
            output_dir: self.output_dir.clone(),
            format: FORMAT_SELECTION.to_string(),
            merge_format: MERGE_FORMAT.to_string(),
        }
    }
}
