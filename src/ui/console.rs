//! Styled terminal output: banner, log lines, progress bar, panels

use crate::error::YtdlProError;
use crate::types::{ProgressLine, RunSummary, VideoMetadata};
use crate::utils::format::{format_count, format_time, format_upload_date};
use colored::{Color, Colorize};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, Write};
use std::time::Duration;

/// Width of the progress bar in cells
pub const BAR_WIDTH: usize = 30;

const SEPARATOR_WIDTH: usize = 56;
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

/// Clear the screen (interactive terminals only) and print the banner
pub fn print_banner() {
    if std::io::stdout().is_terminal() {
        print!("\x1b[2J\x1b[H");
    }

    let banner = [
        "╔════════════════════════════════════════════════════════╗",
        "║                                                        ║",
        "║              🎬  YOUTUBE DOWNLOADER PRO  🎵            ║",
        "║                                                        ║",
        "║          Download videos and audio from YouTube        ║",
        "║                                                        ║",
        "╚════════════════════════════════════════════════════════╝",
    ];
    println!();
    for line in banner {
        println!("{}", line.cyan().bold());
    }
    println!();
}

/// Print "<icon> <message>" in one colour
pub fn log(icon: &str, message: &str, color: Color) {
    println!("{}", format!("{} {}", icon, message).color(color));
}

/// Print a dim horizontal rule
pub fn print_separator() {
    println!("{}", "─".repeat(SEPARATOR_WIDTH).dimmed());
}

/// Print a highlighted section header, e.g., " VIDEO MP4 "
pub fn print_section(label: &str) {
    println!();
    println!("{}", format!(" {} ", label).bold().on_blue());
    println!();
}

/// Filled and empty cell counts for a percentage
pub fn bar_cells(percent: f64) -> (usize, usize) {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    (filled, BAR_WIDTH - filled)
}

/// Bar colour: green above 75%, yellow above 50%, cyan otherwise
pub fn bar_color(percent: f64) -> Color {
    if percent > 75.0 {
        Color::Green
    } else if percent > 50.0 {
        Color::Yellow
    } else {
        Color::Cyan
    }
}

/// Uncoloured bar, e.g., "[███░░░...]"
pub fn render_bar(percent: f64) -> String {
    let (filled, empty) = bar_cells(percent);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Full progress line: bar, percent, size, speed and ETA
pub fn format_progress_line(line: &ProgressLine) -> String {
    let sep = "│".dimmed();
    format!(
        "  {} {}  {}  {}  {}  {}  {}  ETA: {}     ",
        render_bar(line.percent).color(bar_color(line.percent)),
        format!("{:.1}%", line.percent).bold(),
        sep,
        line.size,
        sep,
        line.speed,
        sep,
        line.eta
    )
}

/// Redraw the progress line in place
pub fn render_progress(line: &ProgressLine) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r{}", format_progress_line(line));
    let _ = stdout.flush();
}

/// Start an indeterminate spinner on stdout with the given message
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(SPINNER_FRAMES)
        .template("  {spinner:.cyan} {msg:.cyan}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print the metadata panel
pub fn display_video_info(info: &VideoMetadata) {
    print_separator();
    println!();
    println!("{}", "📺 VIDEO INFORMATION".bold());
    println!();
    println!("  {}     {}", "Title:".cyan(), info.title.bold());
    println!("  {}    {}", "Author:".cyan(), info.author);
    println!("  {}  {}", "Duration:".cyan(), format_time(info.duration));

    if let Some(views) = info.view_count.filter(|v| *v > 0) {
        println!("  {}     {}", "Views:".cyan(), format_count(views));
    }
    if let Some(ref date) = info.upload_date {
        println!("  {}  {}", "Uploaded:".cyan(), format_upload_date(date));
    }

    println!();
    print_separator();
}

/// Print the completion summary
pub fn print_summary(summary: &RunSummary) {
    print_separator();
    println!();
    println!("{}", "✓ DOWNLOAD COMPLETE".green().bold());
    println!(
        "  {}",
        format!("Total time: {:.1}s", summary.elapsed.as_secs_f64()).dimmed()
    );
    println!(
        "  {}",
        format!("Location: {}", summary.output_dir.display()).dimmed()
    );
    println!();
    print_separator();
}

/// Print the error line plus a hint when the failure is a known one
pub fn print_error(err: &YtdlProError) {
    println!();
    println!();
    print_separator();
    log("✗", &format!("ERROR: {}", err), Color::Red);

    if let Some(hint) = err.hint() {
        println!();
        println!("  {}", format!("💡 {}", hint.message()).yellow());
    }

    print_separator();
    println!();
}

/// Print usage help shown when no URL is given
pub fn print_usage() {
    let bin = env!("CARGO_PKG_NAME");

    println!("{}", "USAGE:".bold());
    println!("  {} <URL> [format]", bin);
    println!();
    println!("{}", "EXAMPLES:".bold());
    println!("  {}", "# Download a video as MP4".dimmed());
    println!("  {}", format!("{} \"URL\" mp4", bin).cyan());
    println!();
    println!("  {}", "# Download only the audio as MP3".dimmed());
    println!("  {}", format!("{} \"URL\" mp3", bin).cyan());
    println!();
    println!("{}", "FORMATS:".bold());
    println!("  {} - Video with audio (default)", "mp4".green());
    println!("  {} - Audio only", "mp3".green());
    println!();
    print_separator();
    println!();
}
