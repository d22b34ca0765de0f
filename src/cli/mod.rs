//! CLI command handlers

pub mod commands;

pub use commands::{fill, inspect, serve, template};
