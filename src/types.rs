//! Type definitions for ytdl-pro
//!
//! Source of truth for all data structures.

use crate::error::YtdlProError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================
// Video Types
// ============================================

/// Normalized video information from `yt-dlp --dump-json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    /// Length in seconds
    pub duration: Option<f64>,
    /// Uploader or channel name, "unknown" when neither is reported
    pub author: String,
    /// URL to thumbnail image
    pub thumbnail: Option<String>,
    pub view_count: Option<u64>,
    /// Raw from yt-dlp, e.g., "20231005"
    pub upload_date: Option<String>,
}

/// One progress update parsed from a `[download]` line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    /// Raw percent text, e.g., "45.2%" or "45.2"
    pub percent: Option<String>,
    /// e.g., "10.00MiB" or "~10.00MiB"
    pub total_size: Option<String>,
    /// e.g., "1.23MiB/s"
    pub current_speed: Option<String>,
    /// e.g., "00:12"
    pub eta: Option<String>,
}

impl ProgressEvent {
    /// Percent as a number, accepting plain or "%"-suffixed text
    pub fn percent_value(&self) -> Option<f64> {
        let raw = self.percent.as_deref()?;
        let value: f64 = raw.trim().trim_end_matches('%').trim().parse().ok()?;
        value.is_finite().then(|| value.clamp(0.0, 100.0))
    }
}

// ============================================
// Download Types
// ============================================

/// Requested output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaFormat {
    /// Best video and audio merged into an mp4 container
    #[default]
    Mp4,
    /// Audio only, transcoded to mp3
    Mp3,
}

impl MediaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
        }
    }

    /// Section header printed before the download starts
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mp4 => "VIDEO MP4",
            Self::Mp3 => "AUDIO MP3",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Mp4 => "Video downloaded successfully",
            Self::Mp3 => "Audio downloaded successfully",
        }
    }
}

impl FromStr for MediaFormat {
    type Err = YtdlProError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(Self::Mp4),
            "mp3" => Ok(Self::Mp3),
            other => Err(YtdlProError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Lifecycle of a single download invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Process spawned, no progress seen yet
    Idle,
    /// At least one progress event received
    Active,
    /// Tool exited cleanly
    Done,
    /// Tool reported an error or exited non-zero
    Failed,
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Values shown on one redraw of the progress line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    /// Clamped to [0, 100]
    pub percent: f64,
    pub size: String,
    pub speed: String,
    pub eta: String,
}

impl ProgressLine {
    /// Build a line from an event, substituting placeholders for missing fields
    pub fn from_event(event: &ProgressEvent) -> Option<Self> {
        Some(Self {
            percent: event.percent_value()?,
            size: event.total_size.clone().unwrap_or_else(|| "---".into()),
            speed: event.current_speed.clone().unwrap_or_else(|| "---".into()),
            eta: event.eta.clone().unwrap_or_else(|| "--:--".into()),
        })
    }
}

/// Result of a successful download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// Base name of the output file, when the tool reported one
    pub file_name: Option<String>,
}

/// What the driver reports after a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    /// Absolute path of the output directory
    pub output_dir: PathBuf,
    pub outcome: DownloadOutcome,
}

// ============================================
// Config Types
// ============================================

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where downloaded media is written (default: "./downloads")
    pub output_dir: String,
    /// Directory holding the yt-dlp binary (default: next to this executable)
    pub tool_dir: Option<String>,
    /// Alternative download URL for the yt-dlp binary
    pub tool_download_url: Option<String>,
    /// Upper bound on the metadata query (default: 30)
    pub metadata_timeout_secs: u64,
    /// Minimum time between progress redraws (default: 300)
    pub render_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: "./downloads".into(),
            tool_dir: None,
            tool_download_url: None,
            metadata_timeout_secs: 30,
            render_interval_ms: 300,
        }
    }
}

impl Config {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_value() {
        let event = |p: &str| ProgressEvent {
            percent: Some(p.to_string()),
            ..Default::default()
        };
        assert_eq!(event("45.2%").percent_value(), Some(45.2));
        assert_eq!(event(" 7.0 %").percent_value(), Some(7.0));
        assert_eq!(event("100").percent_value(), Some(100.0));
        assert_eq!(event("Unknown%").percent_value(), None);
        assert_eq!(ProgressEvent::default().percent_value(), None);
    }

    #[test]
    fn test_progress_line_placeholders() {
        let event = ProgressEvent {
            percent: Some("12.5%".into()),
            total_size: Some("3.00MiB".into()),
            ..Default::default()
        };
        let line = ProgressLine::from_event(&event).unwrap();
        assert_eq!(line.percent, 12.5);
        assert_eq!(line.size, "3.00MiB");
        assert_eq!(line.speed, "---");
        assert_eq!(line.eta, "--:--");

        assert!(ProgressLine::from_event(&ProgressEvent::default()).is_none());
    }

    #[test]
    fn test_media_format_parse() {
        assert_eq!("mp4".parse::<MediaFormat>().unwrap(), MediaFormat::Mp4);
        assert_eq!("mp3".parse::<MediaFormat>().unwrap(), MediaFormat::Mp3);
        assert!(matches!(
            "wav".parse::<MediaFormat>(),
            Err(YtdlProError::UnsupportedFormat(f)) if f == "wav"
        ));
    }

    #[test]
    fn test_config_partial_json() {
        let cfg: Config = serde_json::from_str(r#"{"output_dir": "/tmp/media"}"#).unwrap();
        assert_eq!(cfg.output_dir, "/tmp/media");
        assert_eq!(cfg.metadata_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.render_interval(), Duration::from_millis(300));
    }
}
