//! Form state and the single-slot background runner
//!
//! The form is the only orchestrator: it owns the URL text, the last analysis
//! result, the status line and the one worker that may be alive at a time.
//! Workers report back over an unbounded channel which the UI thread drains
//! once per frame through [`Form::poll`].

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{
    runtime::Handle,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tracing::{error, info};

use crate::analysis::run_analysis;
use crate::downloader::spawn_download;
use crate::error::TaskError;
use crate::extractor::{DownloadRequest, MediaExtractor};
use crate::model::{AnalysisResult, TaskEvent, TaskKind};

pub const ANALYSIS_DONE_TIMEOUT: Duration = Duration::from_secs(6);
pub const DOWNLOAD_DONE_TIMEOUT: Duration = Duration::from_secs(10);
pub const ERROR_TIMEOUT: Duration = Duration::from_secs(10);

pub const MSG_WAITING: &str = "Waiting for a URL…";
pub const MSG_BUSY: &str = "Wait for the current operation to finish.";
pub const MSG_EMPTY_URL: &str = "Error: enter a URL.";
pub const MSG_NOT_ANALYZED: &str = "Error: analyze a video before downloading.";

/// Status bar text with an optional expiry
#[derive(Debug, Default)]
pub struct StatusLine {
    message: Option<String>,
    expires_at: Option<Instant>,
}

impl StatusLine {
    /// `None` keeps the message until it is replaced.
    pub fn show(&mut self, message: impl Into<String>, timeout: Option<Duration>) {
        self.message = Some(message.into());
        self.expires_at = timeout.map(|t| Instant::now() + t);
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.expires_at = None;
    }

    pub fn text_at(&self, now: Instant) -> Option<&str> {
        match self.expires_at {
            Some(deadline) if now >= deadline => None,
            _ => self.message.as_deref(),
        }
    }
}

/// Which controls accept input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiState {
    /// URL field and Analyze button
    pub inputs_enabled: bool,
    pub download_enabled: bool,
}

struct RunningTask {
    kind: TaskKind,
    handle: JoinHandle<()>,
}

pub struct Form {
    url: String,
    analysis: Option<AnalysisResult>,
    last_download: Option<String>,
    status: StatusLine,
    current: Option<RunningTask>,
    events_tx: UnboundedSender<TaskEvent>,
    events_rx: UnboundedReceiver<TaskEvent>,
    extractor: Arc<dyn MediaExtractor>,
    runtime: Handle,
    request: DownloadRequest,
}

impl Form {
    pub fn new(extractor: Arc<dyn MediaExtractor>, runtime: Handle, request: DownloadRequest) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        let mut status = StatusLine::default();
        status.show(MSG_WAITING, None);
        Self {
            url: String::new(),
            analysis: None,
            last_download: None,
            status,
            current: None,
            events_tx,
            events_rx,
            extractor,
            runtime,
            request,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Any edit invalidates the held analysis.
    pub fn set_url(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.url {
            return;
        }
        self.url = text;
        self.analysis = None;
        self.last_download = None;
        self.status.clear();
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Basename of the last completed download
    pub fn last_download(&self) -> Option<&str> {
        self.last_download.as_deref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.request.output_dir
    }

    pub fn running(&self) -> Option<TaskKind> {
        self.current.as_ref().map(|task| task.kind)
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn ui_state(&self) -> UiState {
        let idle = !self.is_running();
        UiState {
            inputs_enabled: idle,
            download_enabled: idle && self.analysis.is_some(),
        }
    }

    pub fn status_text(&self, now: Instant) -> Option<&str> {
        self.status.text_at(now)
    }

    /// Starts an analysis worker. Returns `false` if the request was rejected.
    pub fn analyze(&mut self) -> bool {
        if self.is_running() {
            self.status.show(MSG_BUSY, None);
            return false;
        }
        let url = self.url.trim().to_string();
        if url.is_empty() {
            self.status.show(MSG_EMPTY_URL, None);
            return false;
        }

        self.analysis = None;
        self.last_download = None;
        self.status.show("Analyzing URL… please wait.", None);

        let extractor = Arc::clone(&self.extractor);
        let tx = self.events_tx.clone();
        let handle = self.runtime.spawn(async move {
            let event = match run_analysis(extractor.as_ref(), &url).await {
                Ok(result) => TaskEvent::Analyzed(result),
                Err(e) => TaskEvent::Failed(e),
            };
            let _ = tx.send(event);
        });
        self.current = Some(RunningTask {
            kind: TaskKind::Analysis,
            handle,
        });
        true
    }

    /// Starts a download worker. Returns `false` if the request was rejected.
    pub fn download(&mut self) -> bool {
        if self.is_running() {
            self.status.show(MSG_BUSY, None);
            return false;
        }
        let Some(analysis) = self.analysis.clone() else {
            self.status.show(MSG_NOT_ANALYZED, None);
            return false;
        };

        self.last_download = None;
        self.status.show("Starting download…", None);

        let url = self.url.trim().to_string();
        let extractor = Arc::clone(&self.extractor);
        let request = self.request.clone();
        let tx = self.events_tx.clone();
        let handle = self.runtime.spawn(async move {
            let event =
                match spawn_download(extractor.as_ref(), &url, &analysis, &request, &tx).await {
                    Ok(filename) => TaskEvent::Downloaded(filename),
                    Err(e) => TaskEvent::Failed(e),
                };
            let _ = tx.send(event);
        });
        self.current = Some(RunningTask {
            kind: TaskKind::Download,
            handle,
        });
        true
    }

    /// Applies pending worker events. Returns `true` if anything changed.
    pub fn poll(&mut self) -> bool {
        // sampled before draining so a terminal event can't slip past
        let exited = self
            .current
            .as_ref()
            .is_some_and(|task| task.handle.is_finished());

        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            changed = true;
        }

        if exited && self.current.is_some() {
            // the worker ended without a terminal event, i.e. it panicked
            let kind = self.running();
            self.finish_task();
            let err = match kind {
                Some(TaskKind::Download) => TaskError::Download("worker stopped unexpectedly".into()),
                _ => TaskError::Analysis,
            };
            self.status.show(err.to_string(), Some(ERROR_TIMEOUT));
            changed = true;
        }
        changed
    }

    fn apply(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Progress(pct) => {
                self.status.show(format!("Downloading… {pct}%"), None);
            }
            TaskEvent::Analyzed(result) => {
                self.analysis = Some(result);
                self.status.show(
                    "Analysis complete. Ready to download!",
                    Some(ANALYSIS_DONE_TIMEOUT),
                );
                self.finish_task();
            }
            TaskEvent::Downloaded(filename) => {
                self.status.show(
                    format!("Download complete: {filename}"),
                    Some(DOWNLOAD_DONE_TIMEOUT),
                );
                self.last_download = Some(filename);
                self.finish_task();
            }
            TaskEvent::Failed(err) => {
                self.status.show(err.to_string(), Some(ERROR_TIMEOUT));
                self.finish_task();
            }
        }
    }

    /// Joins the worker and frees the slot.
    fn finish_task(&mut self) {
        if let Some(task) = self.current.take() {
            if let Err(e) = self.runtime.block_on(task.handle) {
                error!("{:?} worker ended abnormally: {}", task.kind, e);
            }
        }
    }

    /// Blocks until the active worker, if any, has stopped.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.current.as_ref() {
            info!("Waiting for the {:?} worker before exit", task.kind);
        }
        self.finish_task();
    }
}

impl Drop for Form {
    fn drop(&mut self) {
        self.shutdown();
    }
}
