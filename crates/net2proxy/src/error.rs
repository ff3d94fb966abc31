//! CLI error types with miette diagnostics and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use net2_config::ConfigError;
use net2_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to {url}: {reason}")]
    #[diagnostic(
        code(net2proxy::connection_failed),
        help("Check the site's ip and port, and that the Net2 API service is running.")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(net2proxy::auth_failed),
        help("Check clientid, username and password for this site.")
    )]
    AuthFailed { message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(net2proxy::timeout),
        help("Raise the site's `timeout` or check the server's responsiveness.")
    )]
    Timeout,

    // ── Lookup ───────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(net2proxy::not_found),
        help("Run `{list_command}` to see what is available.")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Operations ───────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(net2proxy::operation_failed), help("Run with -v for the server's reply."))]
    OperationFailed { message: String },

    #[error("Sites failed to start: {sites}")]
    #[diagnostic(code(net2proxy::start_failed))]
    StartFailed { sites: String },

    #[error("Refresh incomplete for: {sites}")]
    #[diagnostic(
        code(net2proxy::sync_incomplete),
        help("Run with -v to see which requests failed.")
    )]
    SyncIncomplete { sites: String },

    #[error("API error: {message}")]
    #[diagnostic(code(net2proxy::api))]
    ApiError { message: String },

    #[error("{0}")]
    #[diagnostic(code(net2proxy::internal))]
    Internal(String),

    // ── Configuration ────────────────────────────────────────────────

    #[error("No config file found at {path}")]
    #[diagnostic(
        code(net2proxy::no_config),
        help("Create the file, or point --config / NET2_CONFIG at an existing one.")
    )]
    NoConfig { path: String },

    #[error("Invalid configuration in {path}")]
    #[diagnostic(
        code(net2proxy::config),
        help("Fix the file and run `net2proxy check` to validate it.")
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── Serialization ───────────────────────────────────────────────

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(net2proxy::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Config { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap a config loading failure for the file at `path`.
    pub fn from_config(path: &std::path::Path, err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, .. } => Self::NoConfig {
                path: path.display().to_string(),
            },
            source => Self::Config {
                path: path.display().to_string(),
                source,
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout => CliError::Timeout,

            CoreError::SiteNotFound { id } => CliError::NotFound {
                resource_type: "site".into(),
                identifier: id.to_string(),
                list_command: "net2proxy check".into(),
            },

            CoreError::DoorNotFound { site, door } => CliError::NotFound {
                resource_type: "door".into(),
                identifier: door.to_string(),
                list_command: format!("net2proxy door list --site {site}"),
            },

            CoreError::UserNotFound { site, user } => CliError::NotFound {
                resource_type: "user".into(),
                identifier: user,
                list_command: format!("net2proxy users list --site {site}"),
            },

            CoreError::DepartmentNotFound { site, department } => CliError::NotFound {
                resource_type: "department".into(),
                identifier: department.to_string(),
                list_command: format!("net2proxy sync --site {site}"),
            },

            CoreError::OpenableDoorNotFound { name, .. } => CliError::NotFound {
                resource_type: "openable door".into(),
                identifier: name,
                list_command: "net2proxy check".into(),
            },

            err @ (CoreError::DoorOperation { .. } | CoreError::UserUpdate { .. }) => {
                CliError::OperationFailed {
                    message: err.to_string(),
                }
            }

            CoreError::SitesFailedToStart { failed } => CliError::StartFailed {
                sites: join_ids(&failed),
            },

            CoreError::Api { message, .. } => CliError::ApiError { message },

            other @ (CoreError::AlreadyStarted { .. }
            | CoreError::NotStarted
            | CoreError::RuntimeUnavailable
            | CoreError::Config { .. }
            | CoreError::Internal(_)) => CliError::Internal(other.to_string()),
        }
    }
}

/// `1, 4, 7`
pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_not_found_points_at_door_list() {
        let err = CliError::from(CoreError::DoorNotFound { site: 2, door: 17 });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        match err {
            CliError::NotFound { list_command, .. } => {
                assert_eq!(list_command, "net2proxy door list --site 2");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failed_commands_keep_the_generic_message() {
        let err = CliError::from(CoreError::DoorOperation {
            door: 5,
            action: "open",
        });
        assert_eq!(err.to_string(), "Unable to open door 5");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn config_errors_split_missing_from_invalid() {
        let path = std::path::Path::new("/etc/net2/config.yml");
        let missing = CliError::from_config(
            path,
            ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        );
        assert!(matches!(missing, CliError::NoConfig { .. }));

        let invalid = CliError::from_config(
            path,
            ConfigError::Validation {
                field: "clientid".into(),
                reason: "is required".into(),
            },
        );
        assert_eq!(invalid.exit_code(), exit_code::USAGE);
    }
}
