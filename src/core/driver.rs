//! Top-level flow: bootstrap, metadata, download, summary

use crate::core::bootstrap::{self, ToolHandle};
use crate::core::downloader::Downloader;
use crate::core::metadata;
use crate::error::Result;
use crate::types::{Config, MediaFormat, RunSummary};
use crate::ui::console;
use crate::utils::paths::{absolute_path, ensure_dir};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Download one URL in the requested format
///
/// Failures are printed with a hint when recognized, then returned so the
/// binary can exit non-zero.
pub async fn run(config: &Config, url: &str, format: &str) -> Result<RunSummary> {
    let started = Instant::now();

    let result = async {
        console::print_banner();
        let tool = bootstrap::ensure_tool_available(config).await?;
        console::print_separator();
        run_with_tool(&tool, config, url, format, started).await
    }
    .await;

    if let Err(ref e) = result {
        debug!(code = ?e.code(), error = %e, "run failed");
        console::print_error(e);
    }
    result
}

/// Everything after the bootstrap step
pub async fn run_with_tool(
    tool: &ToolHandle,
    config: &Config,
    url: &str,
    format: &str,
    started: Instant,
) -> Result<RunSummary> {
    match metadata::fetch_metadata(tool, url, config.metadata_timeout()).await? {
        Some(info) => console::display_video_info(&info),
        None => println!(),
    }

    let format: MediaFormat = format.parse()?;

    let output_dir = PathBuf::from(&config.output_dir);
    ensure_dir(&output_dir).await?;

    let downloader = Downloader::new(tool, config);
    let outcome = match format {
        MediaFormat::Mp4 => downloader.download_video(url).await?,
        MediaFormat::Mp3 => downloader.download_audio(url).await?,
    };

    let summary = RunSummary {
        elapsed: started.elapsed(),
        output_dir: absolute_path(&output_dir),
        outcome,
    };
    info!(elapsed = ?summary.elapsed, "download complete");
    console::print_summary(&summary);

    Ok(summary)
}
