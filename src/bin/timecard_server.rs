//! Timecard API Server binary
//!
//! Serves the timecard generator over HTTP.

use clap::Parser;
use std::path::PathBuf;
use timecard_forge::api::{run_api_server, ApiConfig, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(name = "timecard-server")]
#[command(version)]
#[command(about = "Timecard API Server - fills the timecard spreadsheet template over HTTP")]
#[command(long_about = r#"
Timecard API Server

Endpoints:
  - POST /excel    - JSON timecard in, Timecard.xlsx download out
  - GET  /health   - Health check
  - GET  /version  - Server version info
  - GET  /         - Endpoint listing

Features:
  - CORS enabled for cross-origin requests (browser form submissions)
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON error responses with request IDs
  - Tracing and structured logging (RUST_LOG)

Example usage:
  timecard-server                          # Start on 0.0.0.0:8080
  PORT=3000 timecard-server --host 127.0.0.1

  curl -X POST http://localhost:8080/excel \
    -H "Content-Type: application/json" \
    -d @request.json -o Timecard.xlsx
"#)]
struct Args {
    /// Host address to bind to (use 127.0.0.1 for local only)
    #[arg(short = 'H', long, default_value = DEFAULT_HOST, env = "TIMECARD_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// Custom template (.xlsx); the built-in template is used otherwise
    #[arg(short, long, env = "TIMECARD_TEMPLATE")]
    template: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        template: args.template,
    };

    run_api_server(config).await
}
