use thiserror::Error;

/// Fallback text shown when neither the server nor the error carries
/// anything readable.
pub const GENERIC_MESSAGE: &str = "Something went wrong";

/// Top-level error type for the `starpay-api` crate.
///
/// Built exactly once, at the [`RequestPipeline`](crate::RequestPipeline)
/// boundary. Nothing downstream ever looks at a raw HTTP status again --
/// callers branch on the variant instead.
///
/// `Clone` so a single in-flight result can be handed to every caller
/// waiting on the same request.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No response was received: connection refused, DNS failure, timeout.
    #[error("Network error: {message}")]
    Network { message: String, timed_out: bool },

    /// URL could not be built from the base address and path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request itself could not be assembled (e.g. body failed to serialize).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 401. The session has already been cleared when the caller sees this.
    #[error("Session invalid or expired")]
    Unauthorized { message: Option<String> },

    /// Login succeeded at the HTTP level but no access token came back.
    #[error("Missing access token in response")]
    MissingToken,

    // ── Status errors ───────────────────────────────────────────────
    /// Any 4xx other than 401 (validation, conflict, not found, ...).
    #[error("Request rejected (HTTP {status}): {}", display_message(message))]
    Client { status: u16, message: Option<String> },

    /// Any 5xx.
    #[error("Server error (HTTP {status}): {}", display_message(message))]
    Server { status: u16, message: Option<String> },

    // ── Data ────────────────────────────────────────────────────────
    /// A successful response whose body did not match the expected shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

fn display_message(message: &Option<String>) -> &str {
    message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(GENERIC_MESSAGE)
}

impl Error {
    /// Classify a transport failure that produced no response.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    /// Classify a non-success status into the matching variant.
    ///
    /// `message` is the `{message}` field of the error body, if any.
    pub(crate) fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }

    /// Returns `true` if the session was rejected and the user must log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` if no response was received. Nothing retries on its
    /// own; this is for callers deciding whether to offer a manual retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Returns `true` if the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { timed_out: true, .. })
    }

    /// The HTTP status behind this error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The `message` field the server sent with the error response.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Client { message, .. }
            | Self::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text suitable for showing to an operator.
    ///
    /// Prefers the server-provided message, then the error's own
    /// description, then [`GENERIC_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let Some(msg) = self.server_message().filter(|m| !m.trim().is_empty()) {
            return msg.to_owned();
        }
        let own = self.to_string();
        if own.trim().is_empty() {
            GENERIC_MESSAGE.to_owned()
        } else {
            own
        }
    }
}
