// ── Runtime site configuration ──
//
// These types describe *how* to reach a Net2 server and how to present its
// data. They carry credentials and tuning but never touch disk; the binary
// loads a file through net2-config and hands finished structs in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::model::DoorSequenceItem;

/// Refresh cadence used when the configuration doesn't set one.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// OAuth2 credentials for one site.
#[derive(Debug, Clone)]
pub struct SiteCredentials {
    pub client_id: String,
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Must be requested explicitly.
    DangerAcceptInvalid,
}

/// Department-name prefixes used to classify users.
///
/// Matching is a case-sensitive prefix test. A prefix left unset (or empty)
/// matches no department.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepartmentPrefixes {
    pub staff: Option<String>,
    pub visitors: Option<String>,
    pub contractors: Option<String>,
    pub cleaners: Option<String>,
    pub customers: Option<String>,
    pub cancelled: Option<String>,
}

/// A door shown on the monitoring view, with its display name and zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredDoor {
    pub id: i64,
    pub name: String,
    pub zone: String,
}

/// A named sequence of doors that can be opened together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenableDoor {
    pub name: String,
    pub sequence: Vec<DoorSequenceItem>,
}

/// Configuration for a single site.
///
/// Built by the binary, passed to `Site` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub id: i64,
    pub name: String,
    /// Server root, e.g. `http://10.0.0.5:8080`.
    pub url: Url,
    pub credentials: SiteCredentials,
    pub tls: TlsVerification,
    pub timeout: Duration,
    pub refresh_interval: Duration,
    /// Name of the custom user field that holds the local identifier.
    pub local_id_field: String,
    pub department_prefixes: DepartmentPrefixes,
    pub monitored_doors: Vec<MonitoredDoor>,
    pub openable_doors: Vec<OpenableDoor>,
}

impl SiteConfig {
    /// A config with defaults for everything but identity and connection.
    pub fn new(id: i64, name: impl Into<String>, url: Url, credentials: SiteCredentials) -> Self {
        Self {
            id,
            name: name.into(),
            url,
            credentials,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            local_id_field: String::new(),
            department_prefixes: DepartmentPrefixes::default(),
            monitored_doors: Vec::new(),
            openable_doors: Vec::new(),
        }
    }
}
