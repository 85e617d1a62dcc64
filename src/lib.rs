//! ytdl-pro library
//!
//! Core functionality for the ytdl-pro CLI.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
