//! ytdl-pro - YouTube downloads in your terminal
//!
//! Fetches a video (mp4) or its audio (mp3) through yt-dlp with a friendly progress display.

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ytdl_pro::core::driver;
use ytdl_pro::storage::config::{self, ConfigOverrides};
use ytdl_pro::types::Config;
use ytdl_pro::ui::console;

/// Download YouTube videos and audio, powered by yt-dlp.
#[derive(Parser, Debug)]
#[command(name = "ytdl-pro")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Video URL
    url: Option<String>,

    /// Output format: mp4 (video) or mp3 (audio only)
    #[arg(default_value = "mp4")]
    format: String,

    /// Directory to save downloads in
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Directory holding (or receiving) the yt-dlp binary
    #[arg(long)]
    tool_dir: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "ytdl_pro=debug" } else { "error" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .ok();
}

async fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let loaded = match cli.config {
        Some(ref path) => config::load_config_from(path)
            .await
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => config::load_config().await.context("loading config")?,
    };

    Ok(config::apply_overrides(
        loaded,
        ConfigOverrides {
            output_dir: cli.output_dir.clone(),
            tool_dir: cli.tool_dir.clone(),
        },
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(ref url) = cli.url else {
        console::print_banner();
        console::print_usage();
        return ExitCode::FAILURE;
    };

    let cfg = match build_config(&cli).await {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    match driver::run(&cfg, url, &cli.format).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
