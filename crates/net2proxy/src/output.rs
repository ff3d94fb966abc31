//! Output formatting: rounded tables or pretty JSON, picked by `--output`.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render rows in the chosen format. JSON serializes the rows themselves.
pub fn render_list<R>(format: OutputFormat, rows: &[R]) -> Result<String, CliError>
where
    R: Tabled + serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(render_table(rows)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
    }
}

/// Print the rendered output to stdout.
pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// `yes` / empty, for boolean table cells.
pub fn flag(value: bool) -> &'static str {
    if value { "yes" } else { "" }
}
