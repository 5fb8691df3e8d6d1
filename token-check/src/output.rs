//! Structured report writers: JSON, CSV and the valid-token export.

use anyhow::{Context, Result};
use std::fs;
use token_check_lib::{Report, TokenResult};

/// Pretty-printed JSON array of results.
pub fn render_json(results: &[TokenResult]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    json.push('\n');
    Ok(json)
}

/// CSV with a header row of field names.
///
/// Only valid rows are written unless `include_invalid` is set.
pub fn render_csv(report: &Report, include_invalid: bool) -> String {
    let mut out = TokenResult::FIELD_NAMES.join(",");
    out.push('\n');

    for result in report
        .results()
        .iter()
        .filter(|r| include_invalid || r.is_valid)
    {
        let fields = [
            csv_field(&result.display_value),
            csv_field(&result.raw_value),
            result.is_valid.to_string(),
            csv_field(result.principal_id.as_deref().unwrap_or("")),
            csv_field(result.principal_name.as_deref().unwrap_or("")),
            csv_field(&result.granted_scopes.join(",")),
            csv_field(result.message.as_deref().unwrap_or("")),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// Quote a field if it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write a rendered report to `path`.
pub fn write_report(path: &str, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write output file '{}'", path))
}

/// Write the full value of every valid token, one per line.
///
/// Nothing is written when there are no valid tokens; returns how many
/// tokens were written otherwise.
pub fn write_valid_tokens(path: &str, report: &Report) -> Result<Option<usize>> {
    let tokens = report.valid_raw_tokens();
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut content = tokens.join("\n");
    content.push('\n');
    fs::write(path, content)
        .with_context(|| format!("Failed to write valid tokens to '{}'", path))?;

    Ok(Some(tokens.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use token_check_lib::Aggregator;

    fn sample_report() -> Report {
        let mut aggregator = Aggregator::new(2);
        aggregator.push(TokenResult {
            display_value: "ghp_ab…".to_string(),
            raw_value: "ghp_abcdef".to_string(),
            is_valid: true,
            principal_id: Some("583231".to_string()),
            principal_name: Some("octocat".to_string()),
            granted_scopes: vec!["repo".to_string(), "gist".to_string()],
            message: None,
        });
        aggregator.push(TokenResult::failed(
            "bad…".to_string(),
            "badtoken".to_string(),
            "HTTP 500: oops, \"broken\"",
        ));
        aggregator.finish(false)
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn test_render_csv_valid_only_by_default() {
        let csv = render_csv(&sample_report(), false);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "display_value,raw_value,is_valid,principal_id,principal_name,granted_scopes,message"
        );
        assert_eq!(lines[1], "ghp_ab…,ghp_abcdef,true,583231,octocat,\"repo,gist\",");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_render_csv_include_invalid() {
        let csv = render_csv(&sample_report(), true);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[2],
            "bad…,badtoken,false,,,,\"HTTP 500: oops, \"\"broken\"\"\""
        );
    }

    #[test]
    fn test_render_json_contains_all_results() {
        let report = sample_report();
        let json = render_json(report.results()).unwrap();
        let parsed: Vec<TokenResult> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report.results());
    }

    #[test]
    fn test_write_valid_tokens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valid.txt");
        let path = path.to_str().unwrap();

        assert_eq!(write_valid_tokens(path, &sample_report()).unwrap(), Some(1));
        assert_eq!(fs::read_to_string(path).unwrap(), "ghp_abcdef\n");
    }

    #[test]
    fn test_write_valid_tokens_skips_when_none_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valid.txt");

        let mut aggregator = Aggregator::new(1);
        aggregator.push(TokenResult::failed("x".into(), "x".into(), "Unauthorized / invalid"));
        let report = aggregator.finish(false);

        assert_eq!(write_valid_tokens(path.to_str().unwrap(), &report).unwrap(), None);
        assert!(!path.exists());
    }
}
