use std::path::Path;

/// Prefix of the lines requested with `--progress-template`
pub const PROGRESS_PREFIX: &str = "progress|";
/// Prefix of the line requested with `--print after_move:...`
pub const FINISHED_PREFIX: &str = "finished|";

/// A progress notification from the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Bytes are flowing; `percent_str` is yt-dlp's `_percent_str`, e.g. `" 42.0%"`
    Downloading { percent_str: String },
    /// A file was written; the last one reported is the merged output
    Finished { filename: String },
}

/// Parses one stdout line of a yt-dlp download run.
///
/// Shapes:
/// `progress|<status>|<percent>|<filename>` and `finished|<filepath>`.
pub fn parse_progress_from_line(line: &str) -> Option<ProgressEvent> {
    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let mut parts = rest.splitn(3, '|');
        let status = parts.next()?.trim();
        let percent_str = parts.next()?;
        let filename = parts.next().unwrap_or_default();
        return match status {
            "downloading" => Some(ProgressEvent::Downloading {
                percent_str: percent_str.to_string(),
            }),
            "finished" => Some(ProgressEvent::Finished {
                filename: filename.trim_end().to_string(),
            }),
            _ => None,
        };
    }
    if let Some(path) = line.strip_prefix(FINISHED_PREFIX) {
        let path = path.trim_end();
        if !path.is_empty() {
            return Some(ProgressEvent::Finished {
                filename: path.to_string(),
            });
        }
    }
    None
}

/// Turns `" 42.0% "` into `42`. Anything that is not a number yields `None`.
pub fn parse_percent(text: &str) -> Option<u8> {
    let cleaned = strip_ansi(text);
    let number = cleaned.trim().trim_end_matches('%').trim();
    let value = number.parse::<f32>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 100.0) as u8)
}

/// Basename of a path reported by the extractor.
pub fn file_basename(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

// yt-dlp colours `_percent_str` when it thinks it writes to a terminal
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_with_padding() {
        assert_eq!(parse_percent(" 42.0% "), Some(42));
        assert_eq!(parse_percent("100%"), Some(100));
        assert_eq!(parse_percent("  0.3%"), Some(0));
    }

    #[test]
    fn percent_unparseable_is_dropped() {
        assert_eq!(parse_percent("N/A"), None);
        assert_eq!(parse_percent(""), None);
        assert_eq!(parse_percent("NaN%"), None);
    }

    #[test]
    fn percent_with_colour_codes() {
        assert_eq!(parse_percent("\u{1b}[0;94m 57.3%\u{1b}[0m"), Some(57));
    }

    #[test]
    fn downloading_line() {
        let event = parse_progress_from_line("progress|downloading|  42.0%|/x/Downloads/a.f137.mp4");
        assert_eq!(
            event,
            Some(ProgressEvent::Downloading {
                percent_str: "  42.0%".into()
            })
        );
    }

    #[test]
    fn finished_lines() {
        assert_eq!(
            parse_progress_from_line("progress|finished|100.0%|/x/Downloads/a|b.f251.webm"),
            Some(ProgressEvent::Finished {
                filename: "/x/Downloads/a|b.f251.webm".into()
            })
        );
        assert_eq!(
            parse_progress_from_line("finished|/x/Downloads/My Video.mp4"),
            Some(ProgressEvent::Finished {
                filename: "/x/Downloads/My Video.mp4".into()
            })
        );
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        assert_eq!(parse_progress_from_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_progress_from_line("progress|error|N/A|"), None);
        assert_eq!(parse_progress_from_line("finished|"), None);
    }

    #[test]
    fn basename_of_reported_path() {
        assert_eq!(
            file_basename("/x/Downloads/My Video.mp4").as_deref(),
            Some("My Video.mp4")
        );
        assert_eq!(file_basename("/"), None);
    }
}
