//! Error types for ytdl-pro

use std::time::Duration;
use thiserror::Error;

/// Coarse error categories, stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Tool errors
    ToolUnavailable,
    SpawnError,

    // Remote errors
    MetadataTimeout,
    MetadataError,
    DownloadError,
    NetworkError,

    // User errors
    UnsupportedFormat,
    InvalidConfig,

    // System errors
    FileError,
    ParseError,
}

/// Main error type for ytdl-pro
#[derive(Error, Debug)]
pub enum YtdlProError {
    #[error("Failed to initialize yt-dlp: {0}")]
    ToolUnavailable(String),

    #[error("Timed out after {0:?} waiting for video information")]
    MetadataTimeout(Duration),

    #[error("{0}")]
    Metadata(String),

    #[error("Unsupported format '{0}'. Use \"mp4\" or \"mp3\"")]
    UnsupportedFormat(String),

    #[error("{0}")]
    Download(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl YtdlProError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ToolUnavailable(_) => ErrorCode::ToolUnavailable,
            Self::MetadataTimeout(_) => ErrorCode::MetadataTimeout,
            Self::Metadata(_) => ErrorCode::MetadataError,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::Download(_) => ErrorCode::DownloadError,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::File(_) => ErrorCode::FileError,
            Self::Spawn(_) => ErrorCode::SpawnError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::Json(_) => ErrorCode::ParseError,
        }
    }

    /// Recognized upstream failure, if the message matches one
    pub fn hint(&self) -> Option<ErrorHint> {
        ErrorHint::classify(&self.to_string())
    }
}

/// Upstream failures that get an extra line of advice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorHint {
    RateLimited,
    VideoUnavailable,
    SignInRequired,
}

impl ErrorHint {
    /// Match yt-dlp error text against the known failure markers
    pub fn classify(message: &str) -> Option<Self> {
        if message.contains("HTTP Error 429") {
            Some(Self::RateLimited)
        } else if message.contains("Video unavailable") {
            Some(Self::VideoUnavailable)
        } else if message.contains("Sign in") {
            Some(Self::SignInRequired)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::RateLimited => "Too many requests. Wait a few minutes and try again.",
            Self::VideoUnavailable => "The video is unavailable or private.",
            Self::SignInRequired => "The video requires signing in.",
        }
    }
}

pub type Result<T> = std::result::Result<T, YtdlProError>;
