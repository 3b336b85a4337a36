//! Output formatting for parse results.

use crate::record::{Field, ParseResult};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
    Csv,
}

/// Formats a parse result (header plus rows) in the requested output format.
pub fn format_result(result: &ParseResult, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(result).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(result_to_markdown(result)),
        OutputFormat::Table => Ok(result_to_table(result)),
        OutputFormat::Csv => Ok(result_to_csv(result)),
    }
}

/// Formats a parse result as one object per row, keyed by Value name.
///
/// Only the serialized formats change shape; the tabular formats render the
/// same as [`format_result`].
pub fn format_records(result: &ParseResult, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&result.records())
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => serde_yaml::to_string(&result.records())
            .map_err(|e| format!("YAML serialization failed: {e}")),
        other => format_result(result, other),
    }
}

fn result_to_markdown(result: &ParseResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("| {} |\n", result.header.join(" | ")));
    let rule: Vec<String> = result
        .header
        .iter()
        .map(|h| "-".repeat(h.len().max(3)))
        .collect();
    out.push_str(&format!("|{}|\n", rule.join("|")));

    for row in &result.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|field| field.to_string().replace('|', "\\|"))
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    out
}

fn result_to_table(result: &ParseResult) -> String {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(Field::to_string).collect())
        .collect();

    let widths: Vec<usize> = result
        .header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_table_line(&mut out, &result.header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &cells {
        push_table_line(&mut out, row, &widths);
    }

    out
}

fn push_table_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

fn result_to_csv(result: &ParseResult) -> String {
    let mut out = String::new();

    let header: Vec<String> = result.header.iter().map(|h| csv_escape(h)).collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|f| csv_escape(&f.to_string())).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }

    out
}

fn csv_escape(cell: &str) -> String {
    if cell.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
