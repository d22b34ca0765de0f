use clap::{Parser, Subcommand};
use std::path::PathBuf;
use timecard_forge::api::{ApiConfig, DEFAULT_HOST, DEFAULT_PORT};
use timecard_forge::cli;

#[derive(Parser)]
#[command(name = "timecard")]
#[command(about = "Fill the timecard spreadsheet template from JSON submissions.")]
#[command(long_about = "Timecard - spreadsheet template population

Maps a weekly timecard (employee, week selector, Sun..Sat rows, totals)
onto the fixed cells of a two-week timecard workbook.

COMMANDS:
  serve     - Run the HTTP server (POST /excel)
  fill      - Populate the template from a JSON request file
  template  - Write the built-in template for customization
  inspect   - Show what a populated timecard holds

EXAMPLES:
  timecard serve --port 8080
  timecard fill request.json -o Timecard.xlsx
  timecard template my-template.xlsx
  timecard inspect Timecard.xlsx --week 2")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Run the timecard HTTP server.

ENDPOINTS:
  POST /excel     - JSON timecard in, Timecard.xlsx out
  GET  /health    - Health check
  GET  /version   - Server version
  GET  /          - Endpoint listing

Logging is controlled with RUST_LOG (default: timecard_forge=info,tower_http=info).")]
    /// Run the HTTP server
    Serve {
        /// Host address to bind to (use 127.0.0.1 for local only)
        #[arg(short = 'H', long, default_value = DEFAULT_HOST, env = "TIMECARD_HOST")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
        port: u16,

        /// Custom template (.xlsx); the built-in template is used otherwise
        #[arg(short, long, env = "TIMECARD_TEMPLATE")]
        template: Option<PathBuf>,
    },

    #[command(long_about = "Populate the timecard template from a JSON request file.

REQUEST FORMAT:
  {
    \"employeeName\": \"Alice\",
    \"weekNumber\": 1,
    \"rows\": [{\"date\": \"2024-01-07\", \"project\": \"X\", \"hours\": 8, \"type\": \"OC\", \"notes\": \"\"}, ...],
    \"totalOC\": 8,
    \"totalOT\": 0
  }

At least seven rows (Sunday..Saturday) are required. Dates may be written as
YYYY-MM-DD, YY-MM-DD, YYYY/MM/DD, MM/DD/YYYY, DD-MM-YYYY or DD/MM/YYYY;
unrecognized dates leave their cell blank and are listed in the output.")]
    /// Populate the template from a JSON request file
    Fill {
        /// Path to the JSON request
        request: PathBuf,

        /// Output spreadsheet path
        #[arg(short, long, default_value = "Timecard.xlsx")]
        output: PathBuf,

        /// Custom template (.xlsx)
        #[arg(short, long, env = "TIMECARD_TEMPLATE")]
        template: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write the built-in template to a file
    Template {
        /// Output spreadsheet path (.xlsx)
        output: PathBuf,
    },

    /// Show employee, dates and totals of a populated timecard
    Inspect {
        /// Path to a populated timecard (.xlsx)
        file: PathBuf,

        /// Week tab to read (1 or 2)
        #[arg(short, long, default_value = "1")]
        week: i64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            template,
        } => cli::serve(ApiConfig {
            host,
            port,
            template,
        }),

        Commands::Fill {
            request,
            output,
            template,
            verbose,
        } => Ok(cli::fill(request, output, template, verbose)?),

        Commands::Template { output } => Ok(cli::template(output)?),

        Commands::Inspect { file, week } => Ok(cli::inspect(&file, week)?),
    }
}
