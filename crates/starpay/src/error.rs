//! CLI error types with miette diagnostics.
//!
//! Maps API, session, and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use starpay_config::ConfigError;
use starpay_core::{Error as ApiError, SessionError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the API at {url}: {reason}")]
    #[diagnostic(
        code(starpay::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             URL: {url}\n\
             Override with --base-url or STARPAY_BASE_URL."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {millis}ms")]
    #[diagnostic(
        code(starpay::timeout),
        help("Increase the limit with --timeout-ms or check the service's responsiveness.")
    )]
    Timeout { millis: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Not logged in")]
    #[diagnostic(code(starpay::not_logged_in), help("Run: starpay login"))]
    NotLoggedIn,

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(starpay::auth_failed),
        help("Any stored session has been cleared. Run: starpay login")
    )]
    AuthFailed { message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(starpay::not_found))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(code(starpay::forbidden))]
    Forbidden { message: String },

    #[error("{message}")]
    #[diagnostic(code(starpay::conflict))]
    Conflict { message: String },

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(starpay::api_error))]
    ApiError { status: u16, message: String },

    #[error("Unexpected response from the API: {message}")]
    #[diagnostic(
        code(starpay::bad_response),
        help("Is --base-url pointing at the alert admin API?")
    )]
    BadResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(starpay::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(starpay::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(starpay::config),
        help("Inspect the file with: starpay config show")
    )]
    Config(#[from] ConfigError),

    #[error("Could not read or write the session file")]
    #[diagnostic(
        code(starpay::session),
        help("Delete the session file and log in again if it is corrupt.")
    )]
    Session(#[from] SessionError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(starpay::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotLoggedIn | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Fill in where and how long: API errors are converted without knowing
    /// the endpoint, so `main` patches it in before reporting.
    pub fn with_endpoint(self, url: &str, timeout_ms: u64) -> Self {
        match self {
            Self::ConnectionFailed { reason, .. } => Self::ConnectionFailed {
                url: url.to_owned(),
                reason,
            },
            Self::Timeout { .. } => Self::Timeout { millis: timeout_ms },
            other => other,
        }
    }
}

// ── API error → CliError mapping ─────────────────────────────────────

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        let message = err.user_message();
        match err {
            ApiError::Network {
                timed_out: true, ..
            } => Self::Timeout { millis: 0 },
            ApiError::Network { message, .. } => Self::ConnectionFailed {
                url: "(unknown)".into(),
                reason: message,
            },
            ApiError::Unauthorized { .. } => Self::AuthFailed { message },
            ApiError::MissingToken => Self::AuthFailed {
                message: "the server did not issue a token".into(),
            },
            ApiError::Client { status: 403, .. } => Self::Forbidden { message },
            ApiError::Client { status: 404, .. } => Self::NotFound { message },
            ApiError::Client { status: 409, .. } => Self::Conflict { message },
            ApiError::Client { status, .. } | ApiError::Server { status, .. } => {
                Self::ApiError { status, message }
            }
            ApiError::Deserialization { message, .. } => Self::BadResponse { message },
            ApiError::InvalidUrl(reason) | ApiError::InvalidRequest(reason) => Self::Validation {
                field: "request".into(),
                reason,
            },
        }
    }
}
