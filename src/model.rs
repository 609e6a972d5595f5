use serde::Deserialize;

use crate::error::TaskError;

/// Subset of yt-dlp's `--dump-json` output that the form cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<StreamDescriptor>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// One stream offered by the site
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamDescriptor {
    /// Vertical resolution in pixels; absent for audio-only streams
    #[serde(default)]
    pub height: Option<u32>,
}

/// Decoded RGBA thumbnail, kept free of any GUI types
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

/// Result of a successful analysis, held by the form until the URL changes
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub title: Option<String>,
    pub streams: Vec<StreamDescriptor>,
    pub thumbnail: Option<Thumbnail>,
}

impl AnalysisResult {
    pub fn from_info(info: VideoInfo, thumbnail: Option<Thumbnail>) -> Self {
        Self {
            title: info.title,
            streams: info.formats,
            thumbnail,
        }
    }

    /// Highest resolution reported by any stream, `None` when nothing reports one.
    pub fn best_resolution(&self) -> Option<u32> {
        self.streams.iter().filter_map(|s| s.height).max()
    }

    /// Text for the quality label, e.g. `1080p` or `N/A`.
    pub fn quality_label(&self) -> String {
        match self.best_resolution() {
            Some(height) if height > 0 => format!("{height}p"),
            _ => "N/A".to_string(),
        }
    }

    pub fn title_label(&self) -> &str {
        self.title.as_deref().unwrap_or("N/A")
    }
}

/// Which background task occupies the worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Analysis,
    Download,
}

/// Notifications sent from the worker back to the UI thread
#[derive(Debug)]
pub enum TaskEvent {
    /// Download percentage, 0 to 100
    Progress(u8),
    Analyzed(AnalysisResult),
    /// Basename of the produced file
    Downloaded(String),
    Failed(TaskError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_heights(heights: &[Option<u32>]) -> AnalysisResult {
        AnalysisResult {
            title: Some("clip".into()),
            streams: heights
                .iter()
                .map(|&height| StreamDescriptor { height })
                .collect(),
            thumbnail: None,
        }
    }

    #[test]
    fn best_resolution_is_max_of_present_heights() {
        let result = with_heights(&[Some(360), None, Some(1080), Some(720)]);
        assert_eq!(result.best_resolution(), Some(1080));
        assert_eq!(result.quality_label(), "1080p");
    }

    #[test]
    fn best_resolution_unknown_without_streams() {
        let result = with_heights(&[]);
        assert_eq!(result.best_resolution(), None);
        assert_eq!(result.quality_label(), "N/A");
    }

    #[test]
    fn best_resolution_unknown_when_all_absent() {
        let result = with_heights(&[None, None]);
        assert_eq!(result.best_resolution(), None);
        assert_eq!(result.quality_label(), "N/A");
    }

    #[test]
    fn title_label_falls_back() {
        let mut result = with_heights(&[]);
        result.title = None;
        assert_eq!(result.title_label(), "N/A");
    }

    #[test]
    fn decodes_dump_json_subset() {
        let json = r#"{
            "id": "abc",
            "title": "My Video",
            "thumbnail": "https://example.com/t.jpg",
            "formats": [
                {"format_id": "140", "height": null},
                {"format_id": "137", "height": 1080},
                {"format_id": "sb0"}
            ]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        let result = AnalysisResult::from_info(info, None);
        assert_eq!(result.title_label(), "My Video");
        assert_eq!(result.streams.len(), 3);
        assert_eq!(result.best_resolution(), Some(1080));
    }
}
