//! Formatting and path helpers

pub mod format;
pub mod paths;
