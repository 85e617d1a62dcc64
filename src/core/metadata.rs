//! Video information via `yt-dlp --dump-json`

use crate::core::bootstrap::ToolHandle;
use crate::core::events::exit_error_message;
use crate::error::{Result, YtdlProError};
use crate::types::VideoMetadata;
use crate::ui::console::{self, log};
use colored::Color;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};

/// Fields we read from yt-dlp's info JSON
#[derive(Debug, Deserialize)]
struct RawVideoInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    thumbnail: Option<String>,
    view_count: Option<u64>,
    upload_date: Option<String>,
}

impl From<RawVideoInfo> for VideoMetadata {
    fn from(raw: RawVideoInfo) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        Self {
            title: raw.title.unwrap_or_default(),
            duration: raw.duration,
            author: non_empty(raw.uploader)
                .or_else(|| non_empty(raw.channel))
                .unwrap_or_else(|| "unknown".into()),
            thumbnail: non_empty(raw.thumbnail),
            view_count: raw.view_count,
            upload_date: non_empty(raw.upload_date),
        }
    }
}

/// Parse the first JSON document in yt-dlp's output
pub fn parse_metadata(output: &str) -> Result<VideoMetadata> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| YtdlProError::Metadata("yt-dlp returned no video information".into()))?;

    let raw: RawVideoInfo = serde_json::from_str(line)?;
    Ok(raw.into())
}

/// Fetch video information, giving up quietly after `timeout`
///
/// Returns `Ok(None)` on timeout so the caller can go straight to the download.
/// Every other failure is returned as an error.
pub async fn fetch_metadata(
    tool: &ToolHandle,
    url: &str,
    timeout: Duration,
) -> Result<Option<VideoMetadata>> {
    log("🔍", "Connecting to YouTube...", Color::Cyan);

    let spinner = console::spinner("Fetching video information...");
    let result = query_with_timeout(tool, url, timeout).await;
    spinner.finish_and_clear();

    match result {
        Ok(info) => Ok(Some(info)),
        Err(YtdlProError::MetadataTimeout(after)) => {
            warn!(?after, "metadata query timed out");
            log("⚠", "The request is taking too long", Color::Yellow);
            log("→", "Continuing with direct download...", Color::BrightBlack);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn query_with_timeout(tool: &ToolHandle, url: &str, timeout: Duration) -> Result<VideoMetadata> {
    // Losing the race drops the future, and with it the child process.
    tokio::time::timeout(timeout, query_metadata(tool, url))
        .await
        .map_err(|_| YtdlProError::MetadataTimeout(timeout))?
}

/// Run the info query without any time limit
pub async fn query_metadata(tool: &ToolHandle, url: &str) -> Result<VideoMetadata> {
    debug!(%url, "querying video information");

    let output = tool
        .command()
        .args(["--dump-json", "--no-warnings", "--no-playlist", url])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| YtdlProError::Spawn(format!("Failed to start yt-dlp: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(YtdlProError::Metadata(exit_error_message(
            output.status.code(),
            &stderr,
        )));
    }

    parse_metadata(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata_full() {
        let json = r#"{"title":"Lofi Beats","duration":245.5,"uploader":"Chill Channel","channel":"Chill","thumbnail":"https://i.ytimg.com/vi/x/hq.jpg","view_count":1234567,"upload_date":"20231005","formats":[]}"#;
        let info = parse_metadata(json).unwrap();
        assert_eq!(info.title, "Lofi Beats");
        assert_eq!(info.duration, Some(245.5));
        assert_eq!(info.author, "Chill Channel");
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.ytimg.com/vi/x/hq.jpg"));
        assert_eq!(info.view_count, Some(1_234_567));
        assert_eq!(info.upload_date.as_deref(), Some("20231005"));
    }

    #[test]
    fn test_author_fallbacks() {
        let info = parse_metadata(r#"{"title":"a","uploader":null,"channel":"Chan"}"#).unwrap();
        assert_eq!(info.author, "Chan");

        let info = parse_metadata(r#"{"title":"a","uploader":"","channel":"Chan"}"#).unwrap();
        assert_eq!(info.author, "Chan");

        let info = parse_metadata(r#"{"title":"a"}"#).unwrap();
        assert_eq!(info.author, "unknown");
        assert_eq!(info.duration, None);
        assert_eq!(info.view_count, None);
    }

    #[test]
    fn test_parse_metadata_errors() {
        assert!(matches!(parse_metadata(""), Err(YtdlProError::Metadata(_))));
        assert!(matches!(parse_metadata("not json"), Err(YtdlProError::Json(_))));
    }

    #[cfg(unix)]
    fn shell_tool(script: &str) -> ToolHandle {
        ToolHandle::new("/bin/sh").with_leading_args(["-c", script, "yt-dlp"])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_metadata_success() {
        let tool = shell_tool(r#"echo '{"title":"Song","duration":65,"channel":"Band"}'"#);
        let info = fetch_metadata(&tool, "https://youtu.be/x", Duration::from_secs(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(info.title, "Song");
        assert_eq!(info.author, "Band");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_metadata_timeout_returns_none() {
        let tool = shell_tool("sleep 5");
        let started = std::time::Instant::now();
        let result = fetch_metadata(&tool, "https://youtu.be/x", Duration::from_millis(200)).await;
        assert!(matches!(result, Ok(None)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_metadata_tool_error_propagates() {
        let tool = shell_tool("echo 'ERROR: Sign in to confirm your age' >&2; exit 1");
        let err = fetch_metadata(&tool, "https://youtu.be/x", Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, YtdlProError::Metadata(_)));
        assert!(err.to_string().contains("Sign in"));
    }
}
