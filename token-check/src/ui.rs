//! Terminal display logic for the token-check CLI.
//!
//! This module handles the start banner, the live progress counter, the
//! results table and the summary. Uses only the `console` crate. Progress
//! and banners go to stderr so stdout stays clean for the report.

use console::{measure_text_width, pad_str, style, Alignment, Term};
use token_check_lib::{ProgressSink, Report, TokenResult};

/// Columns wider than this are truncated with `..`.
const MAX_COLUMN_WIDTH: usize = 48;

// ── Banner ───────────────────────────────────────────────────────────────────

/// Print the start banner to stderr.
pub fn print_banner(token_count: usize, workers: usize) {
    eprintln!(
        "{}",
        style(format!(
            "Checking {} tokens with {} workers...",
            token_count, workers
        ))
        .cyan()
    );
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Live `[k/N] Validating tokens` counter on stderr.
///
/// Redraws in place on a terminal and stays silent otherwise. In verbose
/// mode every valid result is also logged with its principal.
pub struct ProgressLine {
    term: Term,
    enabled: bool,
    verbose: bool,
}

impl ProgressLine {
    pub fn new(verbose: bool) -> Self {
        let term = Term::stderr();
        let enabled = term.is_term();
        Self {
            term,
            enabled,
            verbose,
        }
    }

    /// Clear the progress line.
    pub fn finish(&self) {
        if self.enabled {
            let _ = self.term.clear_line();
        }
    }
}

impl ProgressSink for ProgressLine {
    fn on_result(&self, completed: usize, total: usize, result: &TokenResult) {
        if self.enabled {
            let _ = self.term.clear_line();
        }

        if self.verbose && result.is_valid {
            tracing::info!(
                "Valid: {} -> user={}",
                result.display_value,
                result.principal_name.as_deref().unwrap_or("-")
            );
        }

        if self.enabled {
            let _ = self.term.write_str(&format!(
                "{} Validating tokens",
                style(format!("[{}/{}]", completed, total)).dim()
            ));
        }
    }
}

// ── Table ────────────────────────────────────────────────────────────────────

/// Plain-text table cells for one result: token, user, id, scopes and,
/// with `with_status`, the outcome.
pub fn table_row(result: &TokenResult, with_status: bool) -> Vec<String> {
    let mut row = vec![
        result.display_value.clone(),
        result.principal_name.clone().unwrap_or_else(|| "-".to_string()),
        result.principal_id.clone().unwrap_or_else(|| "-".to_string()),
        if result.granted_scopes.is_empty() {
            "-".to_string()
        } else {
            result.granted_scopes.join(", ")
        },
    ];
    if with_status {
        row.push(match &result.message {
            Some(message) => message.clone(),
            None => "valid".to_string(),
        });
    }
    row
}

/// Print the results table to stdout.
///
/// Only valid results are listed unless `include_invalid` is set.
pub fn print_table(report: &Report, include_invalid: bool) {
    let mut headers = vec!["Token", "User", "ID", "Scopes"];
    if include_invalid {
        headers.push("Status");
    }

    let rows: Vec<(bool, Vec<String>)> = report
        .results()
        .iter()
        .filter(|r| include_invalid || r.is_valid)
        .map(|r| (r.is_valid, table_row(r, include_invalid)))
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|(_, row)| measure_text_width(&row[i]))
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(header, width)| {
            style(pad_str(header, *width, Alignment::Left, None).into_owned())
                .green()
                .bold()
                .to_string()
        })
        .collect();
    println!("  {}", header_line.join("  "));

    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("  {}", style(rule.join("  ")).dim());

    for (is_valid, row) in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // ID column is right-aligned
                let align = if i == 2 { Alignment::Right } else { Alignment::Left };
                let padded = pad_str(cell, *width, align, Some("..")).into_owned();
                match i {
                    0 => style(padded).dim().to_string(),
                    4 if !is_valid => style(padded).red().to_string(),
                    4 => style(padded).green().to_string(),
                    _ => padded,
                }
            })
            .collect();
        println!("  {}", cells.join("  "));
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// The count summary line.
pub fn summary_line(report: &Report) -> String {
    format!(
        "Total: {}, Valid: {}, Invalid: {}",
        report.total(),
        report.valid_count(),
        report.invalid_count()
    )
}

/// Print the count summary and, if any, the omitted-invalid note.
pub fn print_summary(report: &Report) {
    println!();
    println!("{}", summary_line(report));
    if report.invalid_count() > 0 {
        println!(
            "{}",
            style(format!("Omitted {} invalid tokens.", report.invalid_count())).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use token_check_lib::Aggregator;

    fn valid_result(token: &str) -> TokenResult {
        TokenResult {
            display_value: token.to_string(),
            raw_value: token.to_string(),
            is_valid: true,
            principal_id: Some("42".to_string()),
            principal_name: Some("octocat".to_string()),
            granted_scopes: vec!["repo".to_string(), "gist".to_string()],
            message: None,
        }
    }

    fn report_of(results: Vec<TokenResult>) -> Report {
        let mut aggregator = Aggregator::new(results.len());
        for result in results {
            aggregator.push(result);
        }
        aggregator.finish(false)
    }

    #[test]
    fn test_table_row_valid() {
        assert_eq!(
            table_row(&valid_result("tokA"), false),
            vec!["tokA", "octocat", "42", "repo, gist"]
        );
    }

    #[test]
    fn test_table_row_invalid_with_status() {
        let result = TokenResult::failed("tokB".into(), "tokB".into(), "Unauthorized / invalid");
        assert_eq!(
            table_row(&result, true),
            vec!["tokB", "-", "-", "-", "Unauthorized / invalid"]
        );
    }

    #[test]
    fn test_summary_line() {
        let report = report_of(vec![
            valid_result("tokA"),
            TokenResult::failed("tokB".into(), "tokB".into(), "Unauthorized / invalid"),
        ]);
        assert_eq!(summary_line(&report), "Total: 2, Valid: 1, Invalid: 1");
    }
}
