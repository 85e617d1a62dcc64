//! yt-dlp output as a stream of typed messages

use crate::core::bootstrap::ToolHandle;
use crate::types::ProgressEvent;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[download\]\s+([\d.]+%)\s+of\s+(~?\s*\S+)(?:\s+at\s+(Unknown B/s|\S+))?(?:\s+ETA\s+(Unknown|\S+))?",
    )
    .expect("Invalid regex")
});

static EVENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]\s]+)\]\s*(.*)$").expect("Invalid regex"));

/// One thing the tool told us
#[derive(Debug, Clone, PartialEq)]
pub enum ToolMessage {
    /// A `[download] NN% of ...` line
    Progress(ProgressEvent),
    /// Any other `[kind] data` line
    Event { kind: String, data: String },
    /// Spawn failure or non-zero exit
    Error(String),
    /// Clean exit
    Close,
}

/// Classify one line of stdout
pub fn parse_line(line: &str) -> Option<ToolMessage> {
    let line = line.trim();

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let field = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        return Some(ToolMessage::Progress(ProgressEvent {
            percent: field(1),
            total_size: field(2).map(|s| s.split_whitespace().collect()),
            current_speed: field(3),
            eta: field(4),
        }));
    }

    let caps = EVENT_RE.captures(line)?;
    Some(ToolMessage::Event {
        kind: caps[1].to_string(),
        data: caps[2].to_string(),
    })
}

/// Output file name announced by a `[kind] data` line, if any
pub fn parse_destination(kind: &str, data: &str) -> Option<String> {
    let path = match kind {
        "download" => {
            let data = data.trim();
            match data.strip_prefix("Destination:") {
                Some(path) => path.trim(),
                None => data.strip_suffix("has already been downloaded")?.trim(),
            }
        }
        "ExtractAudio" => data.trim().strip_prefix("Destination:")?.trim(),
        "Merger" => data
            .trim()
            .strip_prefix("Merging formats into")?
            .trim()
            .trim_matches('"'),
        _ => return None,
    };

    if path.is_empty() {
        return None;
    }

    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

/// Spawn the tool and stream its messages; the last message is always `Close` or `Error`
pub fn exec(tool: &ToolHandle, args: Vec<String>) -> UnboundedReceiver<ToolMessage> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut cmd = tool.command();
    cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());
    debug!(program = %tool.program().display(), ?args, "spawning yt-dlp");

    match cmd.spawn() {
        Ok(child) => {
            tokio::spawn(pump(child, tx));
        }
        Err(e) => {
            let _ = tx.send(ToolMessage::Error(format!("Failed to start yt-dlp: {}", e)));
        }
    }

    rx
}

/// Next line with invalid UTF-8 replaced; `None` at EOF or on a read error
async fn next_lossy_line<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String> {
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) => None,
        Ok(_) => Some(String::from_utf8_lossy(buf).trim_end_matches(['\r', '\n']).to_string()),
        Err(e) => {
            debug!(error = %e, "reading yt-dlp output failed");
            None
        }
    }
}

async fn pump(mut child: Child, tx: UnboundedSender<ToolMessage>) {
    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut raw = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut raw).await {
                debug!(error = %e, "reading yt-dlp stderr failed");
            }
            String::from_utf8_lossy(&raw).into_owned()
        })
    });

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = next_lossy_line(&mut reader, &mut buf).await {
            trace!(%line, "yt-dlp");
            if let Some(message) = parse_line(&line) {
                if tx.send(message).is_err() {
                    // Receiver gone; dropping the child kills it.
                    return;
                }
            }
        }
    }

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    let message = match child.wait().await {
        Ok(status) if status.success() => {
            debug!("yt-dlp exited cleanly");
            ToolMessage::Close
        }
        Ok(status) => {
            debug!(code = ?status.code(), "yt-dlp failed");
            ToolMessage::Error(exit_error_message(status.code(), &stderr))
        }
        Err(e) => ToolMessage::Error(format!("Failed to wait for yt-dlp: {}", e)),
    };
    let _ = tx.send(message);
}

/// Error text for a non-zero exit, carrying yt-dlp's own stderr
pub fn exit_error_message(code: Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("yt-dlp exited with code {}", code),
        None => "yt-dlp was terminated by a signal".to_string(),
    };

    let stderr = stderr.trim();
    if stderr.is_empty() {
        status
    } else {
        format!("{}: {}", status, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_line() {
        let msg = parse_line("[download]  45.2% of ~  10.00MiB at    1.23MiB/s ETA 00:12 (frag 3/10)");
        assert_eq!(
            msg,
            Some(ToolMessage::Progress(ProgressEvent {
                percent: Some("45.2%".into()),
                total_size: Some("~10.00MiB".into()),
                current_speed: Some("1.23MiB/s".into()),
                eta: Some("00:12".into()),
            }))
        );
    }

    #[test]
    fn test_parse_progress_line_without_speed() {
        let Some(ToolMessage::Progress(event)) =
            parse_line("[download] 100% of   50.00MiB in 00:00:03 at 15.2MiB/s")
        else {
            panic!("expected progress");
        };
        assert_eq!(event.percent.as_deref(), Some("100%"));
        assert_eq!(event.total_size.as_deref(), Some("50.00MiB"));
        assert_eq!(event.current_speed, None);
        assert_eq!(event.eta, None);
    }

    #[test]
    fn test_parse_unknown_speed() {
        let Some(ToolMessage::Progress(event)) =
            parse_line("[download]   0.0% of 3.20MiB at Unknown B/s ETA Unknown")
        else {
            panic!("expected progress");
        };
        assert_eq!(event.current_speed.as_deref(), Some("Unknown B/s"));
        assert_eq!(event.eta.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(
            parse_line("[download] Destination: downloads/My Song.webm"),
            Some(ToolMessage::Event {
                kind: "download".into(),
                data: "Destination: downloads/My Song.webm".into(),
            })
        );
        assert_eq!(parse_line("plain text"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_parse_destination() {
        assert_eq!(
            parse_destination("download", "Destination: downloads/My Song.webm"),
            Some("My Song.webm".into())
        );
        assert_eq!(
            parse_destination("ExtractAudio", "Destination: downloads/My Song.mp3"),
            Some("My Song.mp3".into())
        );
        assert_eq!(
            parse_destination("Merger", "Merging formats into \"downloads/Clip.mp4\""),
            Some("Clip.mp4".into())
        );
        assert_eq!(
            parse_destination("download", "downloads/My Song.mp3 has already been downloaded"),
            Some("My Song.mp3".into())
        );
        assert_eq!(parse_destination("download", "Destination:"), None);
        assert_eq!(parse_destination("download", " 50.0% of 1MiB"), None);
        assert_eq!(parse_destination("youtube", "Destination: x.mp4"), None);
    }

    #[test]
    fn test_exit_error_message() {
        assert_eq!(exit_error_message(Some(1), ""), "yt-dlp exited with code 1");
        assert_eq!(
            exit_error_message(Some(1), "ERROR: Video unavailable\n"),
            "yt-dlp exited with code 1: ERROR: Video unavailable"
        );
    }

    #[cfg(unix)]
    fn shell_tool(script: &str) -> ToolHandle {
        ToolHandle::new("/bin/sh").with_leading_args(["-c", script, "yt-dlp"])
    }

    #[cfg(unix)]
    async fn collect(mut rx: UnboundedReceiver<ToolMessage>) -> Vec<ToolMessage> {
        let mut out = Vec::new();
        while let Some(msg) = rx.recv().await {
            out.push(msg);
        }
        out
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_streams_then_closes() {
        let tool = shell_tool(
            "echo '[download] Destination: out/a.webm'; \
             echo '[download]  50.0% of 2.00MiB at 1.00MiB/s ETA 00:01'; \
             echo 'noise'",
        );
        let messages = collect(exec(&tool, vec!["https://example.com".into()])).await;

        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], ToolMessage::Event { ref kind, .. } if kind == "download"));
        assert!(matches!(messages[1], ToolMessage::Progress(_)));
        assert_eq!(messages[2], ToolMessage::Close);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_nonzero_exit_reports_stderr() {
        let tool = shell_tool("echo 'ERROR: [youtube] x: Video unavailable' >&2; exit 1");
        let messages = collect(exec(&tool, Vec::new())).await;

        assert_eq!(messages.len(), 1);
        let ToolMessage::Error(ref text) = messages[0] else {
            panic!("expected error, got {:?}", messages[0]);
        };
        assert!(text.contains("code 1"));
        assert!(text.contains("Video unavailable"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_keeps_reading_past_invalid_utf8() {
        let tool = shell_tool(
            r"printf '[download] Destination: out/caf\351.webm\n'; \
              echo '[download]  50.0% of 2.00MiB at 1.00MiB/s ETA 00:01'; \
              echo '[ExtractAudio] Destination: out/Track.mp3'",
        );
        let messages = collect(exec(&tool, Vec::new())).await;

        assert_eq!(messages.len(), 4, "{:?}", messages);
        let ToolMessage::Event { ref data, .. } = messages[0] else {
            panic!("expected event, got {:?}", messages[0]);
        };
        assert_eq!(data, "Destination: out/caf\u{FFFD}.webm");
        assert!(matches!(messages[1], ToolMessage::Progress(_)));
        assert_eq!(
            messages[2],
            ToolMessage::Event {
                kind: "ExtractAudio".into(),
                data: "Destination: out/Track.mp3".into(),
            }
        );
        assert_eq!(messages[3], ToolMessage::Close);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_stderr_survives_invalid_utf8() {
        let tool = shell_tool(
            r"printf 'WARNING: caf\351\n' >&2; \
              echo 'ERROR: [youtube] x: Video unavailable' >&2; \
              exit 1",
        );
        let messages = collect(exec(&tool, Vec::new())).await;

        let [ToolMessage::Error(text)] = messages.as_slice() else {
            panic!("expected a single error, got {:?}", messages);
        };
        assert!(text.contains("code 1"));
        assert!(text.contains("Video unavailable"));
    }

    #[tokio::test]
    async fn test_exec_missing_binary_is_error() {
        let tool = ToolHandle::new("/definitely/not/here/yt-dlp");
        let messages = {
            let mut rx = exec(&tool, Vec::new());
            let mut out = Vec::new();
            while let Some(msg) = rx.recv().await {
                out.push(msg);
            }
            out
        };
        assert!(matches!(messages.as_slice(), [ToolMessage::Error(_)]));
    }
}
