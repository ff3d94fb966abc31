// ── Core error types ──
//
// Errors surfaced by net2-core. Remote failures on commands are reported
// as generic operation errors; the underlying API error is logged where
// it happens. The `From<net2_api::Error>` impl covers everything else.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out")]
    Timeout,

    // ── Identity errors ──────────────────────────────────────────────
    #[error("Site not found: {id}")]
    SiteNotFound { id: i64 },

    #[error("Door {door} not found on site {site}")]
    DoorNotFound { site: i64, door: i64 },

    #[error("User {user} not found on site {site}")]
    UserNotFound { site: i64, user: String },

    #[error("Department {department} not found on site {site}")]
    DepartmentNotFound { site: i64, department: i64 },

    #[error("No openable door named '{name}' on site {site}")]
    OpenableDoorNotFound { site: i64, name: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Unable to {action} door {door}")]
    DoorOperation { door: i64, action: &'static str },

    #[error("Unable to update user {user}")]
    UserUpdate { user: i64 },

    #[error("Unable to start sites: {failed:?}")]
    SitesFailedToStart { failed: Vec<i64> },

    #[error("Site {site} is already started")]
    AlreadyStarted { site: i64 },

    #[error("Site manager is not started")]
    NotStarted,

    #[error("No async runtime available to run the site scheduler")]
    RuntimeUnavailable,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for unknown site/door/user/department errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SiteNotFound { .. }
                | Self::DoorNotFound { .. }
                | Self::UserNotFound { .. }
                | Self::DepartmentNotFound { .. }
                | Self::OpenableDoorNotFound { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<net2_api::Error> for CoreError {
    fn from(err: net2_api::Error) -> Self {
        match err {
            net2_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            net2_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            net2_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            net2_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            net2_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            net2_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
