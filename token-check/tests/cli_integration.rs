// token-check/tests/cli_integration.rs

use assert_cmd::Command;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use tempfile::{tempdir, NamedTempFile, TempDir};

const USER_BODY: &str = r#"{"login":"octocat","id":583231}"#;

/// Helper to create a test tokens file
fn create_test_tokens_file(tokens: &[&str]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let content = tokens.join("\n");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

/// Command isolated from the caller's config files and TC_* variables.
fn token_check(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("token-check").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("TC_LOG")
        .env_remove("RUST_LOG");
    for key in [
        "TC_WORKERS",
        "TC_DELAY",
        "TC_RETRIES",
        "TC_TIMEOUT",
        "TC_API_URL",
        "TC_MIN_SCOPES",
        "TC_MASK",
        "TC_OUTPUT_FORMAT",
        "TC_TOKENS_FILE",
        "TC_CONFIG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Mock endpoint: `tokA` is valid with `repo`, `tokB` is rejected.
fn start_mock_endpoint() -> MockServer {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/user")
            .header("authorization", "token tokA");
        then.status(200)
            .header("content-type", "application/json")
            .header("x-oauth-scopes", "repo, gist")
            .body(USER_BODY);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/user")
            .header("authorization", "token tokB");
        then.status(401).body(r#"{"message":"Bad credentials"}"#);
    });
    server
}

#[test]
fn test_help_shows_flags() {
    let home = tempdir().unwrap();
    let mut cmd = token_check(&home);
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--tokens-file"))
        .stdout(predicate::str::contains("--api-url"))
        .stdout(predicate::str::contains("--min-scopes"))
        .stdout(predicate::str::contains("--workers"))
        .stdout(predicate::str::contains("--valid-output-file"))
        .stdout(predicate::str::contains("--output-format"));
}

#[test]
fn test_empty_tokens_file_is_rejected() {
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["", "   ", ""]);
    let path = file.path().to_str().unwrap();

    let mut cmd = token_check(&home);
    cmd.args(["--tokens-file", path]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(format!("Error: {} is empty.", path)));
}

#[test]
fn test_missing_tokens_file_is_rejected() {
    let home = tempdir().unwrap();
    let mut cmd = token_check(&home);

    // Defaults to tokens.txt in the (empty) working directory
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read tokens file 'tokens.txt'"));
}

#[test]
fn test_invalid_worker_count() {
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA"]);
    let mut cmd = token_check(&home);
    cmd.args(["--tokens-file", file.path().to_str().unwrap(), "-w", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Workers must be between 1 and 100"));
}

#[test]
fn test_mask_conflicts_with_full_token() {
    let home = tempdir().unwrap();
    let mut cmd = token_check(&home);
    cmd.args(["--mask", "--full-token"]);

    cmd.assert().failure();
}

#[test]
fn test_text_output_lists_valid_tokens_and_summary() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA", "tokB"]);

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        &server.url("/user"),
        "--delay",
        "0",
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Checking 2 tokens with 2 workers..."))
        .stdout(predicate::str::contains("octocat"))
        .stdout(predicate::str::contains("583231"))
        .stdout(predicate::str::contains("Total: 2, Valid: 1, Invalid: 1"))
        .stdout(predicate::str::contains("Omitted 1 invalid tokens."))
        .stdout(predicate::str::contains("tokB").not());
}

#[test]
fn test_masked_text_output() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA"]);

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        &server.url("/user"),
        "--delay",
        "0",
        "--mask",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("tokA…"))
        .stdout(predicate::str::contains("Total: 1, Valid: 1, Invalid: 0"));
}

#[test]
fn test_json_output_includes_all_results() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA", "tokB"]);

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        &server.url("/user"),
        "--delay",
        "0",
        "--output-format",
        "json",
    ]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let results: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 2);

    let rejected = results
        .iter()
        .find(|r| r["raw_value"] == "tokB")
        .unwrap();
    assert_eq!(rejected["is_valid"], false);
    assert_eq!(rejected["message"], "Unauthorized / invalid");
}

#[test]
fn test_csv_output_to_file_and_valid_export() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA", "tokB"]);
    let csv_path = home.path().join("out.csv");
    let valid_path = home.path().join("valid.txt");

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        &server.url("/user"),
        "--delay",
        "0",
        "--min-scopes",
        "repo",
        "--output-format",
        "csv",
        "--output-file",
        csv_path.to_str().unwrap(),
        "--valid-output-file",
        valid_path.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Wrote 1 valid tokens to"))
        .stderr(predicate::str::contains("Wrote output to"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "display_value,raw_value,is_valid,principal_id,principal_name,granted_scopes,message"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("tokA,tokA,true,583231,octocat,"));

    assert_eq!(fs::read_to_string(&valid_path).unwrap(), "tokA\n");
}

#[test]
fn test_insufficient_scopes_reported_in_csv() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA"]);
    let valid_path = home.path().join("valid.txt");

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        &server.url("/user"),
        "--delay",
        "0",
        "--min-scopes",
        "repo,admin",
        "--output-format",
        "csv",
        "--include-invalid",
        "--valid-output-file",
        valid_path.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Insufficient scopes: repo,gist"));

    // No valid tokens: export is not written
    assert!(!valid_path.exists());
}

#[test]
fn test_config_file_supplies_defaults() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    fs::write(home.path().join("tokens.txt"), "tokA\ntokB\n").unwrap();
    fs::write(
        home.path().join("token-check.toml"),
        format!(
            "[defaults]\napi_url = \"{}\"\ndelay = \"0s\"\noutput_format = \"json\"\n",
            server.url("/user")
        ),
    )
    .unwrap();

    let mut cmd = token_check(&home);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"raw_value\": \"tokA\""))
        .stdout(predicate::str::contains("\"raw_value\": \"tokB\""));
}

#[test]
fn test_env_overrides_config_file() {
    let server = start_mock_endpoint();
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA"]);
    fs::write(
        home.path().join("token-check.toml"),
        "[defaults]\noutput_format = \"json\"\n",
    )
    .unwrap();

    let mut cmd = token_check(&home);
    cmd.env("TC_OUTPUT_FORMAT", "csv")
        .env("TC_API_URL", server.url("/user"))
        .env("TC_DELAY", "0")
        .args(["--tokens-file", file.path().to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("display_value,raw_value"));
}

#[test]
fn test_oversized_delay_is_rejected() {
    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["tokA"]);

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        "http://127.0.0.1:1/user",
        "--delay",
        "1e20",
    ]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Invalid delay"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_verbose_log_file_records_valid_tokens_masked() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/user")
            .header("authorization", "token ghp_secretvalue123");
        then.status(200)
            .header("content-type", "application/json")
            .header("x-oauth-scopes", "repo")
            .body(USER_BODY);
    });

    let home = tempdir().unwrap();
    let file = create_test_tokens_file(&["ghp_secretvalue123"]);
    let log_path = home.path().join("run.log");

    let mut cmd = token_check(&home);
    cmd.args([
        "--tokens-file",
        file.path().to_str().unwrap(),
        "--api-url",
        &server.url("/user"),
        "--delay",
        "0",
        "--mask",
        "-v",
        "--log-file",
        log_path.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Valid: ghp_se… -> user=octocat"));

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Valid: ghp_se… -> user=octocat"));
    assert!(!log.contains("ghp_secretvalue123"));
    assert!(!log.contains('\x1b'));
}
