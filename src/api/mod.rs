//! Timecard API Server module
//!
//! HTTP endpoint that turns a JSON timecard into a populated spreadsheet.
//! Run with `timecard serve` or `timecard-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig, AppState, DEFAULT_HOST, DEFAULT_PORT};
