//! yt-grab: paste a video URL, inspect it, download it merged into one file

// Command-line flags and fixed download settings
mod config;
// Error types
mod error;
// yt-dlp seam and process driver
mod extractor;
// Metadata-only analysis task
mod analysis;
// Download task and progress folding
mod downloader;
// Progress line parsing
mod progress;
// Thumbnail preview fetching
mod thumbnail;
// Data models shared by tasks and the form
mod model;
// Form state machine and background runner
mod form;

use anyhow::anyhow;
use clap::Parser;
use config::{AppConfig, Cli};
use eframe::{App, Frame, egui};
use egui::{ColorImage, RichText, TextureOptions, Visuals};
use extractor::{MediaExtractor, YtDlp};
use form::Form;
use once_cell::sync::OnceCell;
use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::runtime::Runtime;
use tracing::{Level, info, warn};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

fn runtime() -> std::io::Result<&'static Arc<Runtime>> {
    RUNTIME.get_or_try_init(|| Runtime::new().map(Arc::new))
}

/// Program entry point: parses flags, starts logging and the runtime, launches the GUI
fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_cli(Cli::parse());

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let rt = runtime()?;
    let extractor: Arc<dyn MediaExtractor> = Arc::new(YtDlp::locate(config.ytdlp.clone()));
    let form = Form::new(extractor, rt.handle().clone(), config.download_request());
    info!("Downloads go to {}", config.output_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([520.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "yt-grab",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(GrabApp::new(form))
        }),
    )
    .map_err(|e| anyhow!("GUI error: {e}"))
}

/// Window state around the form; dropping it waits for the active worker
struct GrabApp {
    form: Form,
    /// Texture for the thumbnail of the held analysis
    thumbnail: Option<egui::TextureHandle>,
}

impl GrabApp {
    fn new(form: Form) -> Self {
        Self {
            form,
            thumbnail: None,
        }
    }

    fn sync_thumbnail(&mut self, ctx: &egui::Context) {
        match self.form.analysis().and_then(|a| a.thumbnail.as_ref()) {
            Some(thumb) if self.thumbnail.is_none() => {
                let img = ColorImage::from_rgba_unmultiplied(thumb.size, &thumb.rgba);
                self.thumbnail = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
            }
            Some(_) => {}
            None => self.thumbnail = None,
        }
    }
}

impl App for GrabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.form.poll();
        self.sync_thumbnail(ctx);
        let state = self.form.ui_state();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(self.form.status_text(Instant::now()).unwrap_or_default());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("yt-grab");

            ui.label("Video URL:");
            ui.horizontal(|ui| {
                let mut url = self.form.url().to_owned();
                let edit = ui.add_enabled(
                    state.inputs_enabled,
                    egui::TextEdit::singleline(&mut url).hint_text("Paste the URL here…"),
                );
                if edit.changed() {
                    self.form.set_url(url);
                }
                if ui
                    .add_enabled(state.inputs_enabled, egui::Button::new("Analyze"))
                    .clicked()
                {
                    self.form.analyze();
                }
            });
            ui.add_space(15.0);

            let analysis = self.form.analysis();
            ui.label("Video title:");
            let title = analysis.map_or("…", |a| a.title_label());
            ui.add(egui::Label::new(RichText::new(title).strong()).wrap(true));
            ui.add_space(8.0);

            ui.label("Best available quality:");
            let quality = analysis.map_or_else(|| "…".to_string(), |a| a.quality_label());
            ui.label(RichText::new(quality).strong());

            if let Some(tex) = &self.thumbnail {
                ui.add_space(8.0);
                ui.image(tex);
            }
            ui.add_space(15.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(state.download_enabled, egui::Button::new("Download"))
                    .clicked()
                {
                    self.form.download();
                }
                if state.inputs_enabled
                    && self.form.last_download().is_some()
                    && ui.button("Open folder").clicked()
                {
                    open_folder(self.form.output_dir());
                }
            });
        });

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Opens the download folder in the platform file manager
fn open_folder(folder: &Path) {
    #[cfg(target_os = "windows")]
    let opener = "explorer";
    #[cfg(target_os = "macos")]
    let opener = "open";
    #[cfg(all(unix, not(target_os = "macos")))]
    let opener = "xdg-open";

    if let Err(e) = std::process::Command::new(opener).arg(folder).spawn() {
        warn!("Could not open {}: {}", folder.display(), e);
    }
}
