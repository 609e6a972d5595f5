//! yt-dlp wrapper
//!
//! The form only ever talks to [`MediaExtractor`]; [`YtDlp`] drives the real
//! binary as a child process.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, error, info, warn};

use crate::error::ExtractorError;
use crate::model::VideoInfo;
use crate::progress::{ProgressEvent, parse_progress_from_line};

/// Where and how a download is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub output_dir: PathBuf,
    /// yt-dlp `-f` expression
    pub format: String,
    /// Container for merged video+audio
    pub merge_format: String,
}

impl DownloadRequest {
    /// `<dir>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> String {
        self.output_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

/// The two calls the application makes into the extraction tool
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Metadata only, no media bytes are fetched
    async fn extract_info(&self, url: &str) -> Result<VideoInfo, ExtractorError>;

    /// Downloads and merges; returns once the output file is complete
    async fn download(
        &self,
        url: &str,
        request: &DownloadRequest,
        on_progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<(), ExtractorError>;
}

/// Production extractor backed by the yt-dlp executable
pub struct YtDlp {
    binary: Option<PathBuf>,
}

impl YtDlp {
    /// Resolves the binary once; a missing binary surfaces when a task runs.
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        let binary = find_ytdlp(explicit.as_deref());
        match &binary {
            Some(path) => info!("Using yt-dlp at {}", path.display()),
            None => warn!("yt-dlp not found; analysis and downloads will fail"),
        }
        Self { binary }
    }

    fn binary(&self) -> Result<&Path, ExtractorError> {
        self.binary.as_deref().ok_or(ExtractorError::NotFound)
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn extract_info(&self, url: &str) -> Result<VideoInfo, ExtractorError> {
        debug!("Extracting video info for URL: {}", url);

        let output = Command::new(self.binary()?)
            .args(info_args(url))
            .output()
            .await?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            error!("yt-dlp extraction failed: {}", error_msg.trim());
            return Err(ExtractorError::Failed(last_line(&error_msg)));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn download(
        &self,
        url: &str,
        request: &DownloadRequest,
        on_progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<(), ExtractorError> {
        let args = download_args(url, request);
        debug!("yt-dlp {}", args.join(" "));

        let mut child = Command::new(self.binary()?)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractorError::Failed("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractorError::Failed("yt-dlp stderr unavailable".into()))?;

        // drained concurrently so a chatty stderr can't stall stdout
        let stderr_reader = tokio::spawn(async move {
            let mut last = None;
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("yt-dlp stderr> {}", line);
                if !line.trim().is_empty() {
                    last = Some(line);
                }
            }
            last
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_progress_from_line(&line) {
                Some(event) => on_progress(event),
                None => debug!("yt-dlp> {}", line),
            }
        }

        let status = child.wait().await?;
        let last_stderr = stderr_reader.await.ok().flatten();

        if !status.success() {
            let message = last_stderr
                .map(|line| line.trim().to_string())
                .unwrap_or_else(|| format!("yt-dlp exited with {status}"));
            error!("yt-dlp download failed: {}", message);
            return Err(ExtractorError::Failed(message));
        }
        Ok(())
    }
}

// -J prints exactly one JSON document, a playlist included;
// --flat-playlist keeps yt-dlp from resolving every entry
fn info_args(url: &str) -> Vec<String> {
    vec![
        "-J".to_owned(),
        "--flat-playlist".to_owned(),
        "--no-download".to_owned(),
        "--no-warnings".to_owned(),
        "--no-playlist".to_owned(),
        url.to_owned(),
    ]
}

pub(crate) fn download_args(url: &str, request: &DownloadRequest) -> Vec<String> {
    let mut args = vec!["-f".to_owned(), request.format.clone()];

    args.push("--merge-output-format".to_owned());
    args.push(request.merge_format.clone());

    args.push("--no-playlist".to_owned());
    args.push("--newline".to_owned());
    // --print implies --quiet; --progress keeps the progress lines coming
    args.push("--progress".to_owned());
    args.push("--progress-template".to_owned());
    args.push(
        "download:progress|%(progress.status)s|%(progress._percent_str)s|%(progress.filename)s"
            .to_owned(),
    );
    args.push("--print".to_owned());
    args.push("after_move:finished|%(filepath)s".to_owned());

    args.push("-o".to_owned());
    args.push(request.output_template());
    args.push(url.to_owned());
    args
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string()
}

/// Finds yt-dlp: explicit path, then PATH, then common install locations.
pub fn find_ytdlp(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!("--yt-dlp {} does not exist, searching PATH", path.display());
    }

    if let Ok(path) = which::which("yt-dlp") {
        return Some(path);
    }

    common_paths().into_iter().find(|path| path.is_file())
}

fn common_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/opt/homebrew/bin/yt-dlp"),
        PathBuf::from("/usr/local/bin/yt-dlp"),
        PathBuf::from("/usr/bin/yt-dlp"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".local/bin/yt-dlp"));
    }
    paths
}
