//! # Token Check Library
//!
//! A concurrent validator for bearer-style API credentials.
//!
//! Each token is presented to an authorization-check endpoint, the response
//! is classified (valid, unauthorized, insufficient scopes, other failure),
//! and the results of a whole batch are aggregated into valid and invalid
//! sets. A fixed pool of workers shares one connection pool, paces its own
//! requests, and waits out rate-limit windows on its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use token_check_lib::{CancelToken, CheckPolicy, NoProgress, TokenChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = CheckPolicy::default()
//!         .with_workers(4)
//!         .with_required_scopes(vec!["repo".to_string()]);
//!     let checker = TokenChecker::new(policy)?;
//!
//!     let tokens = vec!["ghp_first".to_string(), "ghp_second".to_string()];
//!     let report = checker
//!         .check_tokens(tokens, &CancelToken::new(), &NoProgress)
//!         .await?;
//!
//!     println!("{} of {} tokens are valid", report.valid_count(), report.total());
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
// This makes them available as token_check_lib::TypeName
pub use checker::{classify, TokenChecker};
pub use concurrent::{CancelToken, WorkerPool};
pub use config::{
    load_env_config, load_env_config_from, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
    OutputConfig, TransportConfig,
};
pub use error::TokenCheckError;
pub use rate_limit::RateLimitDecision;
pub use report::{Aggregator, NoProgress, ProgressSink, Report};
pub use transport::{HttpTransport, ProbeFuture, ProbeResponse, Transport};
pub use types::{CheckPolicy, OutputFormat, TokenResult, DEFAULT_ENDPOINT};
pub use utils::{mask_token, parse_duration_string, parse_scope_list, parse_token_list};

// Public modules
pub mod rate_limit;
pub mod transport;

// Internal modules - these are not part of the public API
mod checker;
mod concurrent;
mod config;
mod error;
mod report;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TokenCheckError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
