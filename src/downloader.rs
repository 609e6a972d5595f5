use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::extractor::{DownloadRequest, MediaExtractor};
use crate::model::{AnalysisResult, TaskEvent};
use crate::progress::{ProgressEvent, file_basename, parse_percent};

/// Folds progress events into percentages and remembers the last finished file.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    finished: Option<String>,
}

impl DownloadTracker {
    /// Returns a percentage to surface, if the event carries a readable one.
    pub fn observe(&mut self, event: ProgressEvent) -> Option<u8> {
        match event {
            ProgressEvent::Downloading { percent_str } => parse_percent(&percent_str),
            ProgressEvent::Finished { filename } => {
                if let Some(name) = file_basename(&filename) {
                    debug!("Finished writing {}", name);
                    self.finished = Some(name);
                }
                None
            }
        }
    }

    /// Final basename; falls back to the sanitized title plus `extension`
    /// when nothing finished.
    pub fn into_filename(self, title: Option<&str>, extension: &str) -> String {
        self.finished.unwrap_or_else(|| {
            format!(
                "{}.{}",
                sanitize_filename(title.unwrap_or("video")),
                extension
            )
        })
    }
}

/// Downloads `url` into the request's output directory, forwarding progress.
pub async fn spawn_download(
    extractor: &dyn MediaExtractor,
    url: &str,
    analysis: &AnalysisResult,
    request: &DownloadRequest,
    progress_tx: &UnboundedSender<TaskEvent>,
) -> Result<String, TaskError> {
    std::fs::create_dir_all(&request.output_dir).map_err(|e| {
        warn!("Cannot create {}: {}", request.output_dir.display(), e);
        TaskError::Download(e.to_string())
    })?;

    info!("Downloading {} into {}", url, request.output_dir.display());
    let mut tracker = DownloadTracker::default();
    let mut on_progress = |event: ProgressEvent| {
        if let Some(pct) = tracker.observe(event) {
            let _ = progress_tx.send(TaskEvent::Progress(pct));
        }
    };

    extractor
        .download(url, request, &mut on_progress)
        .await
        .map_err(|e| TaskError::Download(e.to_string()))?;

    let filename = tracker.into_filename(analysis.title.as_deref(), &request.merge_format);
    info!("Download complete: {}", filename);
    Ok(filename)
}

/// Replaces characters that are not allowed in file names.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fake::FakeExtractor;
    use tokio::sync::mpsc::unbounded_channel;

    fn analysis(title: &str) -> AnalysisResult {
        AnalysisResult {
            title: Some(title.to_string()),
            streams: Vec::new(),
            thumbnail: None,
        }
    }

    fn request_in(dir: &std::path::Path) -> DownloadRequest {
        DownloadRequest {
            output_dir: dir.join("Downloads"),
            format: "bestvideo*+bestaudio/best".into(),
            merge_format: "mp4".into(),
        }
    }

    fn downloading(pct: &str) -> ProgressEvent {
        ProgressEvent::Downloading {
            percent_str: pct.to_string(),
        }
    }

    #[test]
    fn tracker_reports_percent_and_drops_garbage() {
        let mut tracker = DownloadTracker::default();
        assert_eq!(tracker.observe(downloading(" 42.0% ")), Some(42));
        assert_eq!(tracker.observe(downloading("N/A")), None);
    }

    #[test]
    fn tracker_keeps_last_finished_basename() {
        let mut tracker = DownloadTracker::default();
        tracker.observe(ProgressEvent::Finished {
            filename: "/x/Downloads/My Video.f137.mp4".into(),
        });
        tracker.observe(ProgressEvent::Finished {
            filename: "/x/Downloads/My Video.mp4".into(),
        });
        assert_eq!(tracker.into_filename(Some("ignored"), "mp4"), "My Video.mp4");
    }

    #[test]
    fn tracker_falls_back_to_sanitized_title() {
        let tracker = DownloadTracker::default();
        assert_eq!(tracker.into_filename(Some("AC/DC: Live?"), "mp4"), "AC_DC_ Live_.mp4");
        assert_eq!(DownloadTracker::default().into_filename(None, "mp4"), "video.mp4");
    }

    #[test]
    fn sanitize_handles_edge_cases() {
        assert_eq!(sanitize_filename("  plain title  "), "plain title");
        assert_eq!(sanitize_filename("dots..."), "dots");
        assert_eq!(sanitize_filename("   "), "video");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[tokio::test]
    async fn download_creates_dir_and_reports_finished_name() {
        let dir = tempfile::tempdir().unwrap();
        let request = request_in(dir.path());
        let fake = FakeExtractor::new("My Video", &[]).with_events(vec![
            downloading(" 42.0% "),
            downloading("N/A"),
            downloading("100%"),
            ProgressEvent::Finished {
                filename: "/x/Downloads/My Video.mp4".into(),
            },
        ]);
        let (tx, mut rx) = unbounded_channel();

        let name = spawn_download(&fake, "https://example.com/v", &analysis("My Video"), &request, &tx)
            .await
            .unwrap();

        assert_eq!(name, "My Video.mp4");
        assert!(request.output_dir.is_dir());

        let mut seen = Vec::new();
        while let Ok(TaskEvent::Progress(p)) = rx.try_recv() {
            seen.push(p);
        }
        assert_eq!(seen, vec![42, 100]);
    }

    #[tokio::test]
    async fn download_error_includes_cause() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeExtractor::new("x", &[]).failing_download("HTTP Error 403: Forbidden");
        let (tx, _rx) = unbounded_channel();

        let err = spawn_download(&fake, "u", &analysis("x"), &request_in(dir.path()), &tx)
            .await
            .unwrap_err();

        assert_eq!(err, TaskError::Download("HTTP Error 403: Forbidden".into()));
        assert_eq!(err.to_string(), "Error during download: HTTP Error 403: Forbidden");
    }

    #[tokio::test]
    async fn fallback_name_follows_requested_container() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = request_in(dir.path());
        request.merge_format = "mkv".into();
        let fake = FakeExtractor::new("Live Set", &[]);
        let (tx, _rx) = unbounded_channel();

        let name = spawn_download(&fake, "u", &analysis("Live Set"), &request, &tx)
            .await
            .unwrap();

        assert_eq!(name, "Live Set.mkv");
    }
}
