//! Downloader module - yt-dlp download orchestration
//!
//! The tool's output arrives as [`ToolMessage`]s. A [`DownloadSession`] turns
//! them into state transitions and redraw decisions; [`follow`] drives a
//! session to completion and does the printing.

use crate::core::bootstrap::ToolHandle;
use crate::core::events::{self, ToolMessage, parse_destination};
use crate::error::{Result, YtdlProError};
use crate::types::{Config, DownloadOutcome, DownloadState, MediaFormat, ProgressLine};
use crate::ui::console::{self, log};
use colored::{Color, Colorize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// What the caller should do after feeding a message to a session
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Nothing to show
    Quiet,
    /// A progress event; `started` is set only for the first one,
    /// `line` only when the redraw interval has passed
    Progress {
        started: bool,
        line: Option<ProgressLine>,
    },
    /// Tool exited cleanly
    Finished(DownloadOutcome),
    /// Tool failed
    Failed(String),
}

/// State of one download invocation
#[derive(Debug)]
pub struct DownloadSession {
    format: MediaFormat,
    state: DownloadState,
    render_interval: Duration,
    last_render: Instant,
    file_name: Option<String>,
}

impl DownloadSession {
    pub fn new(format: MediaFormat, render_interval: Duration, now: Instant) -> Self {
        Self {
            format,
            state: DownloadState::Idle,
            render_interval,
            last_render: now,
            file_name: None,
        }
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Advance the state machine; messages after Done/Failed are ignored
    pub fn apply(&mut self, message: ToolMessage, now: Instant) -> Step {
        if self.state.is_terminal() {
            return Step::Quiet;
        }

        match message {
            ToolMessage::Progress(event) => {
                let started = self.state == DownloadState::Idle;
                if started {
                    self.state = DownloadState::Active;
                }

                let mut line = None;
                if now.duration_since(self.last_render) >= self.render_interval {
                    line = ProgressLine::from_event(&event);
                    self.last_render = now;
                }

                Step::Progress { started, line }
            }
            ToolMessage::Event { kind, data } => {
                if let Some(name) = parse_destination(&kind, &data) {
                    debug!(%name, "output file");
                    self.file_name = Some(name);
                }
                Step::Quiet
            }
            ToolMessage::Error(message) => {
                self.state = DownloadState::Failed;
                Step::Failed(message)
            }
            ToolMessage::Close => {
                self.state = DownloadState::Done;
                Step::Finished(DownloadOutcome {
                    file_name: self.file_name.clone(),
                })
            }
        }
    }
}

/// Consume messages until the session finishes, rendering as we go
pub async fn follow(
    mut rx: UnboundedReceiver<ToolMessage>,
    mut session: DownloadSession,
) -> Result<DownloadOutcome> {
    while let Some(message) = rx.recv().await {
        match session.apply(message, Instant::now()) {
            Step::Quiet => {}
            Step::Progress { started, line } => {
                if started {
                    log("🚀", "Starting download...", Color::Green);
                    println!();
                }
                if let Some(line) = line {
                    console::render_progress(&line);
                }
            }
            Step::Finished(outcome) => {
                println!("\n");
                log("✓", session.format().success_message(), Color::Green);
                if let Some(ref name) = outcome.file_name {
                    println!("  {}", format!("→ {}", name).dimmed());
                }
                return Ok(outcome);
            }
            Step::Failed(message) => {
                println!("\n");
                log("✗", "Download failed", Color::Red);
                return Err(YtdlProError::Download(message));
            }
        }
    }

    Err(YtdlProError::Download(
        "yt-dlp output ended without an exit status".into(),
    ))
}

/// yt-dlp arguments for one download
pub fn build_args(url: &str, format: MediaFormat, output_template: &str) -> Vec<String> {
    let mut args = vec![url.to_string()];

    match format {
        MediaFormat::Mp4 => args.extend(
            ["-f", VIDEO_FORMAT, "--merge-output-format", "mp4"].map(String::from),
        ),
        MediaFormat::Mp3 => args.extend(
            ["-x", "--audio-format", "mp3", "--audio-quality", "0"].map(String::from),
        ),
    }

    args.extend(["-o".to_string(), output_template.to_string()]);
    args.extend(
        ["--no-playlist", "--progress", "--newline", "--no-warnings"].map(String::from),
    );
    args
}

/// Runs downloads with one tool into one output directory
pub struct Downloader<'a> {
    tool: &'a ToolHandle,
    output_dir: PathBuf,
    render_interval: Duration,
}

impl<'a> Downloader<'a> {
    pub fn new(tool: &'a ToolHandle, config: &Config) -> Self {
        Self {
            tool,
            output_dir: PathBuf::from(&config.output_dir),
            render_interval: config.render_interval(),
        }
    }

    /// `<output_dir>/<title>.<ext>`
    pub fn output_template(&self) -> String {
        self.output_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .to_string()
    }

    /// Best video and audio, merged to mp4
    pub async fn download_video(&self, url: &str) -> Result<DownloadOutcome> {
        self.download(url, MediaFormat::Mp4).await
    }

    /// Audio only, transcoded to mp3 at best quality
    pub async fn download_audio(&self, url: &str) -> Result<DownloadOutcome> {
        self.download(url, MediaFormat::Mp3).await
    }

    pub async fn download(&self, url: &str, format: MediaFormat) -> Result<DownloadOutcome> {
        console::print_section(format.label());

        let args = build_args(url, format, &self.output_template());
        info!(%url, format = format.as_str(), "starting download");

        let rx = events::exec(self.tool, args);
        let session = DownloadSession::new(format, self.render_interval, Instant::now());
        follow(rx, session).await
    }
}
