//! Terminal rendering

pub mod console;
