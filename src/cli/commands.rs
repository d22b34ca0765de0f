use crate::api::{run_api_server, ApiConfig};
use crate::core::{resolve_layout, TimecardPopulator};
use crate::error::TimecardResult;
use crate::excel::{build_default_template, TemplateStore, TimecardReader};
use crate::types::TimecardRequest;
use chrono::NaiveDate;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d (%a)").to_string(),
        None => "(blank)".dimmed().to_string(),
    }
}

/// Execute the serve command
pub fn serve(config: ApiConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_api_server(config))
}

/// Execute the fill command: populate the template from a JSON request file
pub fn fill(
    request_file: PathBuf,
    output: PathBuf,
    template: Option<PathBuf>,
    verbose: bool,
) -> TimecardResult<()> {
    println!("{}", "Timecard - Fill".bold().green());
    println!("   Request: {}", request_file.display());
    println!("   Output:  {}\n", output.display());

    if verbose {
        println!("{}", "Reading request...".cyan());
    }
    let request = TimecardRequest::from_json(&fs::read(&request_file)?)?;
    let layout = resolve_layout(request.week_number);

    if verbose {
        println!(
            "   Employee: {}",
            if request.employee_name.is_empty() {
                "(none)"
            } else {
                request.employee_name.as_str()
            }
        );
        println!("   Week {} -> sheet {}", request.week_number, layout.sheet.bright_blue());
        println!("   {} rows\n", request.rows.len());
    }

    let store = TemplateStore::load(template.as_deref())?;
    if verbose {
        println!("   Template: {}\n", store.origin());
    }

    let populator = TimecardPopulator::new(store);
    let report = populator.populate_with_report(&request)?;
    fs::write(&output, &report.bytes)?;

    if !report.skipped.is_empty() {
        println!(
            "{}",
            format!("{} date cell(s) left blank:", report.skipped.len()).yellow()
        );
        for cell in &report.skipped {
            println!(
                "   {}!{} <- {:?}",
                cell.sheet,
                cell.cell.bright_yellow(),
                cell.input
            );
        }
        println!();
    }

    println!("{}", "Timecard written".bold().green());
    println!("   {} ({} bytes)\n", output.display(), report.bytes.len());
    Ok(())
}

/// Execute the template command: write the built-in template to disk
pub fn template(output: PathBuf) -> TimecardResult<()> {
    let bytes = build_default_template()?;
    fs::write(&output, &bytes)?;

    println!("{}", "Template written".bold().green());
    println!("   {}", output.display());
    println!("   Keep the sheet names and cell positions when customizing it.\n");
    Ok(())
}

/// Execute the inspect command: show what a populated timecard holds
pub fn inspect(file: &Path, week: i64) -> TimecardResult<()> {
    let layout = resolve_layout(week);
    let mut reader = TimecardReader::open(file)?;
    let summary = reader.read_summary(layout)?;

    println!("{}", "Timecard - Inspect".bold().green());
    println!("   File:  {}", file.display());
    println!("   Sheet: {}\n", summary.sheet.bright_blue().bold());

    println!(
        "   {:<12} {}",
        "Employee",
        summary
            .employee_name
            .as_deref()
            .unwrap_or("(blank)")
    );
    println!("   {:<12} {}", "Week start", format_date(summary.week_start));

    println!("\n   {}", "Dates".cyan());
    for (i, (primary, overtime)) in summary
        .primary_dates
        .iter()
        .zip(&summary.overtime_dates)
        .enumerate()
    {
        println!(
            "   {:>3}  {:<24} {}",
            i + 1,
            format_date(*primary),
            format_date(*overtime)
        );
    }

    println!("\n   {}", "Totals".cyan());
    for (label, value) in [("OC", summary.total_oc), ("OT", summary.total_ot)] {
        println!(
            "   {:<12} {}",
            label,
            value.map(format_number).unwrap_or_else(|| "(blank)".to_string())
        );
    }
    println!();
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
