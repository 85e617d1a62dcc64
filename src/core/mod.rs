//! Core modules: tool bootstrap, event stream, metadata, downloads, driver

pub mod bootstrap;
pub mod downloader;
pub mod driver;
pub mod events;
pub mod metadata;
