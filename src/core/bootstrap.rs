//! yt-dlp bootstrap: locate the binary, download it on first run

use crate::error::{Result, YtdlProError};
use crate::types::Config;
use crate::ui::console::{self, log};
use crate::utils::paths::{ensure_dir, get_install_dir, tool_binary_name};
use colored::{Color, Colorize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Where users can fetch the binary by hand
pub const RELEASES_PAGE: &str = "https://github.com/yt-dlp/yt-dlp/releases";

const RELEASE_DOWNLOAD_BASE: &str = "https://github.com/yt-dlp/yt-dlp/releases/latest/download";
const CHECKSUMS_ASSET: &str = "SHA2-256SUMS";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A runnable yt-dlp
#[derive(Debug, Clone)]
pub struct ToolHandle {
    program: PathBuf,
    /// Inserted before every argument list, e.g., when launching through an interpreter
    leading_args: Vec<String>,
    version: Option<String>,
}

impl ToolHandle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            version: None,
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// New command for one invocation; the child dies with its handle
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Release asset matching the host platform
pub fn release_asset_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else if cfg!(target_arch = "aarch64") {
        "yt-dlp_linux_aarch64"
    } else {
        "yt-dlp"
    }
}

/// Directory the binary lives in
pub fn tool_dir(config: &Config) -> PathBuf {
    config
        .tool_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(get_install_dir)
}

/// Make sure yt-dlp is on disk and return a handle to it
pub async fn ensure_tool_available(config: &Config) -> Result<ToolHandle> {
    let dir = tool_dir(config);
    let path = dir.join(tool_binary_name());
    debug!(path = %path.display(), "resolving yt-dlp");

    if !path.exists() {
        log("📥", "Downloading yt-dlp for the first time...", Color::Yellow);
        console::print_separator();

        let spinner = console::spinner("Downloading binary...");
        let result = install_tool(config, &path).await;
        spinner.finish_and_clear();

        if let Err(e) = result {
            warn!(error = %e, "yt-dlp download failed");
            log("✗", "Failed to download yt-dlp", Color::Red);
            print_manual_install(&dir);
            return Err(YtdlProError::ToolUnavailable(e.to_string()));
        }
        log("✓", "yt-dlp downloaded successfully", Color::Green);
    }

    let mut handle = ToolHandle::new(path);
    handle.version = query_version(&handle).await;
    match handle.version() {
        Some(version) => log("✓", &format!("yt-dlp initialized (v{})", version), Color::Green),
        None => log("✓", "yt-dlp initialized", Color::Green),
    }

    Ok(handle)
}

/// `yt-dlp --version`, or None if it cannot be run
pub async fn query_version(handle: &ToolHandle) -> Option<String> {
    let output = handle
        .command()
        .arg("--version")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| debug!(error = %e, "version query failed"))
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!version.is_empty()).then_some(version)
}

fn print_manual_install(dir: &Path) {
    println!();
    println!("{}", "💡 Alternative solution:".yellow());
    println!("  1. Download from: {}", RELEASES_PAGE.cyan());
    println!(
        "  2. Place {} in: {}",
        tool_binary_name().bold(),
        dir.display()
    );
    println!();
}

/// Download the binary to `target`, verifying it when it comes from the official release
async fn install_tool(config: &Config, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        ensure_dir(parent).await?;
    }

    let url = config
        .tool_download_url
        .clone()
        .unwrap_or_else(|| format!("{}/{}", RELEASE_DOWNLOAD_BASE, release_asset_name()));
    info!(%url, "downloading yt-dlp");

    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;

    let bytes = client.get(&url).send().await?.error_for_status()?.bytes().await?;

    if config.tool_download_url.is_none() {
        verify_release_checksum(&client, &bytes).await?;
    } else {
        debug!("custom download URL, skipping checksum verification");
    }

    let temp_path = target.with_extension("part");
    if let Err(e) = write_executable(&temp_path, &bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, target).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    Ok(())
}

async fn write_executable(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}

async fn verify_release_checksum(client: &reqwest::Client, bytes: &[u8]) -> Result<()> {
    let manifest_url = format!("{}/{}", RELEASE_DOWNLOAD_BASE, CHECKSUMS_ASSET);
    let manifest = client
        .get(&manifest_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let expected = parse_sha256_for_asset(&manifest, release_asset_name()).ok_or_else(|| {
        YtdlProError::ToolUnavailable(format!(
            "no checksum listed for {}",
            release_asset_name()
        ))
    })?;

    let actual = sha256_hex(bytes);
    if !actual.eq_ignore_ascii_case(&expected) {
        return Err(YtdlProError::ToolUnavailable(format!(
            "checksum mismatch for {} (expected {}, got {})",
            release_asset_name(),
            expected,
            actual
        )));
    }

    debug!("checksum verified");
    Ok(())
}

/// Find an asset's hash in a `sha256sum`-style manifest
pub fn parse_sha256_for_asset(manifest: &str, asset: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == asset).then(|| hash.to_lowercase())
    })
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
