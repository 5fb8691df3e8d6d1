//! Token Check CLI Application
//!
//! A command-line interface for validating bearer tokens concurrently against an
//! authorization-check endpoint. This CLI application provides a user-friendly
//! interface to the token-check-lib library.

mod output;
mod ui;

use anyhow::{bail, Context, Result};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::fs::OpenOptions;
use std::process;
use std::sync::Mutex;
use std::time::Duration;
use token_check_lib::{
    load_env_config, parse_duration_string, parse_token_list, CancelToken, CheckPolicy,
    ConfigManager, EnvConfig, FileConfig, OutputFormat, TokenCheckError, TokenChecker,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Token list read when nothing else is configured.
const DEFAULT_TOKENS_FILE: &str = "tokens.txt";

/// CLI arguments for token-check
#[derive(Parser, Debug)]
#[command(name = "token-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate API tokens concurrently against an authorization endpoint")]
#[command(
    long_about = "Validate bearer-style API tokens concurrently.\n\nEach token is sent to the check endpoint, classified as valid, unauthorized or under-scoped, and reported as a table, JSON or CSV. Valid tokens can be exported to a separate file."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// File with one token per line (default: tokens.txt)
    #[arg(long = "tokens-file", value_name = "FILE", help_heading = "Input")]
    pub tokens_file: Option<String>,

    /// Authorization-check endpoint (default: https://api.github.com/user)
    #[arg(long = "api-url", value_name = "URL", help_heading = "Request")]
    pub api_url: Option<String>,

    /// Scopes every valid token must carry (comma-separated)
    #[arg(
        long = "min-scopes",
        value_name = "SCOPES",
        value_delimiter = ',',
        help_heading = "Request"
    )]
    pub min_scopes: Option<Vec<String>>,

    /// Number of concurrent workers (default: 2, max: 100)
    #[arg(short = 'w', long = "workers", value_name = "N", help_heading = "Performance")]
    pub workers: Option<usize>,

    /// Seconds each worker sleeps after every request (default: 1.0)
    #[arg(long = "delay", value_name = "SECS", help_heading = "Performance")]
    pub delay: Option<f64>,

    /// Retries for transient HTTP failures (default: 2)
    #[arg(long = "retries", value_name = "N", help_heading = "Performance")]
    pub retries: Option<u32>,

    /// Per-request timeout, e.g. 10s, 500ms (default: 10s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Show only the first characters of each token
    #[arg(long = "mask", conflicts_with = "full_token", help_heading = "Output")]
    pub mask: bool,

    /// Show tokens in full (default)
    #[arg(long = "full-token", help_heading = "Output")]
    pub full_token: bool,

    /// Output format: text, json or csv (default: text)
    #[arg(long = "output-format", value_name = "FORMAT", help_heading = "Output")]
    pub output_format: Option<OutputFormat>,

    /// Write json/csv output to this file instead of stdout
    #[arg(long = "output-file", value_name = "FILE", help_heading = "Output")]
    pub output_file: Option<String>,

    /// Write the full value of every valid token to this file
    #[arg(long = "valid-output-file", value_name = "FILE", help_heading = "Output")]
    pub valid_output_file: Option<String>,

    /// Also show invalid tokens in the table and CSV
    #[arg(long = "include-invalid", help_heading = "Output")]
    pub include_invalid: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Also write log output to this file
    #[arg(long = "log-file", value_name = "FILE", help_heading = "Configuration")]
    pub log_file: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Everything a run needs once CLI, environment and config files are merged.
#[derive(Debug, Clone, PartialEq)]
struct RunSettings {
    policy: CheckPolicy,
    tokens_file: String,
    output_format: OutputFormat,
    output_file: Option<String>,
    valid_output_file: Option<String>,
    include_invalid: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            policy: CheckPolicy::default(),
            tokens_file: DEFAULT_TOKENS_FILE.to_string(),
            output_format: OutputFormat::default(),
            output_file: None,
            valid_output_file: None,
            include_invalid: false,
        }
    }
}

enum RunOutcome {
    Completed,
    Interrupted,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = init_logging(args.verbose, args.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    match run(args).await {
        Ok(RunOutcome::Completed) => {}
        Ok(RunOutcome::Interrupted) => {
            eprintln!("{}", console::style("Interrupted. Exiting...").red());
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(workers) = args.workers {
        if workers == 0 || workers > 100 {
            return Err("Workers must be between 1 and 100".to_string());
        }
    }

    if let Some(delay) = args.delay {
        if Duration::try_from_secs_f64(delay).is_err() {
            return Err(format!("Invalid delay '{}': expected a non-negative number of seconds", delay));
        }
    }

    if let Some(timeout) = &args.timeout {
        match parse_duration_string(timeout) {
            Some(d) if !d.is_zero() => {}
            _ => {
                return Err(format!(
                    "Invalid timeout '{}'. Use format like '500ms', '10s', '2m'",
                    timeout
                ))
            }
        }
    }

    if let Some(url) = &args.api_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("API URL '{}' must start with http:// or https://", url));
        }
    }

    Ok(())
}

/// Install the tracing subscriber: stderr always, plus an optional log file.
///
/// `TC_LOG` (or `RUST_LOG`) overrides the default filter.
fn init_logging(verbose: bool, log_file: Option<&str>) -> Result<()> {
    let default_filter = if verbose {
        "info,token_check=debug,token_check_lib=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env("TC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

async fn run(args: Args) -> Result<RunOutcome> {
    let env_config = load_env_config();
    let file_config = load_file_config(&args, &env_config)?;
    let settings = build_settings(&args, file_config, &env_config)?;

    let tokens = read_tokens(&settings.tokens_file)?;
    ui::print_banner(tokens.len(), settings.policy.workers);

    let checker = TokenChecker::new(settings.policy.clone())?;

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let progress = ui::ProgressLine::new(args.verbose);
    let report = checker.check_tokens(tokens, &cancel, &progress).await?;
    progress.finish();

    if report.was_cancelled() {
        tracing::debug!(
            completed = report.total(),
            skipped = report.skipped(),
            "run cancelled"
        );
        return Ok(RunOutcome::Interrupted);
    }

    if let Some(path) = &settings.valid_output_file {
        if let Some(count) = output::write_valid_tokens(path, &report)? {
            eprintln!(
                "{}",
                console::style(format!("Wrote {} valid tokens to {}", count, path)).green()
            );
        }
    }

    match settings.output_format {
        OutputFormat::Text => {
            ui::print_table(&report, settings.include_invalid);
            ui::print_summary(&report);
        }
        format => {
            let rendered = match format {
                OutputFormat::Json => output::render_json(report.results())?,
                _ => output::render_csv(&report, settings.include_invalid),
            };
            match &settings.output_file {
                Some(path) => {
                    output::write_report(path, &rendered)?;
                    eprintln!(
                        "{}",
                        console::style(format!("Wrote output to {}", path)).green()
                    );
                }
                None => print!("{}", rendered),
            }
        }
    }

    Ok(RunOutcome::Completed)
}

/// Load the explicit config file (`--config`, then `TC_CONFIG`) or discover one.
fn load_file_config(args: &Args, env_config: &EnvConfig) -> Result<FileConfig> {
    let manager = ConfigManager::new(args.verbose);

    if let Some(path) = args.config.as_ref().or(env_config.config.as_ref()) {
        tracing::debug!(path = %path, "using explicit config file");
        return manager
            .load_file(path)
            .with_context(|| format!("Failed to load config file '{}'", path));
    }

    Ok(manager.discover_and_load()?)
}

/// Merge settings: CLI > environment > config file > built-in defaults.
fn build_settings(args: &Args, file_config: FileConfig, env_config: &EnvConfig) -> Result<RunSettings> {
    let mut settings = RunSettings::default();

    // Step 1: config file
    merge_file_config(&mut settings, file_config)?;

    // Step 2: TC_* environment variables
    apply_environment_config(&mut settings, env_config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args(&mut settings, args);

    if settings.policy.endpoint.trim().is_empty() {
        bail!("API URL cannot be empty");
    }

    Ok(settings)
}

fn merge_file_config(settings: &mut RunSettings, file_config: FileConfig) -> Result<()> {
    let policy = &mut settings.policy;

    if let Some(defaults) = file_config.defaults {
        if let Some(workers) = defaults.workers {
            policy.workers = workers;
        }
        if let Some(delay) = defaults.delay.as_deref().and_then(parse_duration_string) {
            policy.per_worker_delay = delay;
        }
        if let Some(retries) = defaults.retries {
            policy.retry_count = retries;
        }
        if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration_string) {
            policy.request_timeout = timeout;
        }
        if let Some(api_url) = defaults.api_url {
            policy.endpoint = api_url;
        }
        if let Some(scopes) = defaults.min_scopes {
            policy.required_scopes = normalize_scopes(&scopes);
        }
        if let Some(mask) = defaults.mask {
            policy.mask_output = mask;
        }
        if let Some(format) = defaults.output_format {
            settings.output_format = format.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(tokens_file) = defaults.tokens_file {
            settings.tokens_file = tokens_file;
        }
    }

    if let Some(output) = file_config.output {
        if output.output_file.is_some() {
            settings.output_file = output.output_file;
        }
        if output.valid_output_file.is_some() {
            settings.valid_output_file = output.valid_output_file;
        }
        if let Some(include_invalid) = output.include_invalid {
            settings.include_invalid = include_invalid;
        }
    }

    if let Some(transport) = file_config.transport {
        let policy = &mut settings.policy;
        if let Some(factor) = transport.backoff_factor.as_deref().and_then(parse_duration_string) {
            policy.backoff_factor = factor;
        }
        if let Some(statuses) = transport.retry_statuses {
            policy.retry_statuses = statuses;
        }
        if let Some(scheme) = transport.auth_scheme {
            policy.auth_scheme = scheme;
        }
        if let Some(user_agent) = transport.user_agent {
            policy.user_agent = user_agent;
        }
    }

    Ok(())
}

fn apply_environment_config(settings: &mut RunSettings, env_config: &EnvConfig) {
    let policy = &mut settings.policy;

    if let Some(workers) = env_config.workers {
        policy.workers = workers;
    }
    if let Some(delay) = env_config.delay.as_deref().and_then(parse_duration_string) {
        policy.per_worker_delay = delay;
    }
    if let Some(retries) = env_config.retries {
        policy.retry_count = retries;
    }
    if let Some(timeout) = env_config.timeout.as_deref().and_then(parse_duration_string) {
        policy.request_timeout = timeout;
    }
    if let Some(api_url) = &env_config.api_url {
        policy.endpoint = api_url.clone();
    }
    if let Some(scopes) = &env_config.min_scopes {
        policy.required_scopes = scopes.clone();
    }
    if let Some(mask) = env_config.mask {
        policy.mask_output = mask;
    }
    if let Some(format) = env_config.output_format {
        settings.output_format = format;
    }
    if let Some(tokens_file) = &env_config.tokens_file {
        settings.tokens_file = tokens_file.clone();
    }
}

fn apply_cli_args(settings: &mut RunSettings, args: &Args) {
    let policy = &mut settings.policy;

    if let Some(workers) = args.workers {
        policy.workers = workers;
    }
    if let Some(delay) = args.delay.and_then(|d| Duration::try_from_secs_f64(d).ok()) {
        policy.per_worker_delay = delay;
    }
    if let Some(retries) = args.retries {
        policy.retry_count = retries;
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_duration_string) {
        policy.request_timeout = timeout;
    }
    if let Some(api_url) = &args.api_url {
        policy.endpoint = api_url.clone();
    }
    if let Some(scopes) = &args.min_scopes {
        policy.required_scopes = normalize_scopes(scopes);
    }

    // Only override masking when a flag was passed, so env/config values survive.
    if args.mask {
        policy.mask_output = true;
    }
    if args.full_token {
        policy.mask_output = false;
    }

    if let Some(format) = args.output_format {
        settings.output_format = format;
    }
    if let Some(tokens_file) = &args.tokens_file {
        settings.tokens_file = tokens_file.clone();
    }
    if args.output_file.is_some() {
        settings.output_file = args.output_file.clone();
    }
    if args.valid_output_file.is_some() {
        settings.valid_output_file = args.valid_output_file.clone();
    }
    if args.include_invalid {
        settings.include_invalid = true;
    }

    // Keep the worker bound even when a config file or env var set it.
    policy.workers = policy.workers.clamp(1, 100);
}

fn normalize_scopes(scopes: &[String]) -> Vec<String> {
    token_check_lib::parse_scope_list(&scopes.join(","))
}

/// Read the token list; an empty list is a fatal input error.
fn read_tokens(path: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tokens file '{}'", path))?;

    let tokens = parse_token_list(&content);
    if tokens.is_empty() {
        return Err(TokenCheckError::empty_input(path).into());
    }

    Ok(tokens)
}

// token-check/src/main.rs tests module
