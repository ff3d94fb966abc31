//! Configuration for the Net2 site proxy.
//!
//! A YAML file listing the Net2 servers to mirror, merged with `NET2_`
//! environment overrides, validated, and translated into
//! `net2_core::SiteConfig` values. Core never reads files itself.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use net2_core::{
    DepartmentPrefixes, DoorSequenceItem, MonitoredDoor, OpenableDoor, SiteConfig,
    SiteCredentials, TlsVerification,
};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "./config.yml";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── YAML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// OAuth client ID issued for the Net2 API, shared by every site.
    #[serde(rename = "clientid", default)]
    pub client_id: String,

    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// One Net2 server.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    pub id: Option<i64>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub username: String,

    /// Password in plaintext. Prefer `passwordEnv`.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Host name or address of the Net2 server.
    #[serde(default)]
    pub ip: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default, alias = "http")]
    pub https: bool,

    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,

    #[serde(default = "default_refresh_interval", with = "humantime_duration")]
    pub refresh_interval: Duration,

    /// Name of the custom user field holding the local identifier.
    #[serde(rename = "localIDField", alias = "localIdField", default)]
    pub local_id_field: String,

    pub staff_department_prefix: Option<String>,
    pub visitor_department_prefix: Option<String>,
    #[serde(alias = "contractorDepartmentsPrefix")]
    pub contractor_department_prefix: Option<String>,
    #[serde(alias = "cleaningDepartmentPrefix")]
    pub cleaner_department_prefix: Option<String>,
    pub customer_department_prefix: Option<String>,
    pub cancelled_department_prefix: Option<String>,

    #[serde(default)]
    pub monitored_doors: Vec<MonitoredDoorEntry>,

    #[serde(default)]
    pub openable_doors: Vec<OpenableDoorEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MonitoredDoorEntry {
    pub id: i64,
    #[serde(rename = "doorName", alias = "name", default)]
    pub name: String,
    #[serde(rename = "zoneName", alias = "zone", default)]
    pub zone: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct OpenableDoorEntry {
    pub name: String,
    #[serde(default)]
    pub sequence: Vec<SequenceEntry>,
}

/// A door to open and how long to wait before the next one.
#[derive(Debug, Deserialize, Serialize)]
pub struct SequenceEntry {
    pub id: i64,
    #[serde(default, with = "humantime_duration")]
    pub duration: Duration,
}

fn default_port() -> u16 {
    8080
}
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_refresh_interval() -> Duration {
    net2_core::DEFAULT_REFRESH_INTERVAL
}

/// Durations written as `"90s"`, `"1m 30s"` or `"500ms"`.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(D::Error::custom)
    }
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config file at `path`, with environment overrides.
///
/// `NET2_CLIENTID` overrides the top-level `clientid`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    std::fs::metadata(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed("NET2_").only(&["clientid"]));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Check the required fields. Errors name the offending site.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(invalid("clientid", "is required"));
        }

        let mut seen = HashSet::new();
        for (index, site) in self.sites.iter().enumerate() {
            let label = site.label(index);
            let Some(id) = site.id else {
                return Err(invalid("id", format!("is required for site {label}")));
            };
            if !seen.insert(id) {
                return Err(invalid("id", format!("{id} is used by more than one site")));
            }
            if site.username.trim().is_empty() {
                return Err(invalid("username", format!("is required for site {label}")));
            }
            if site.password.is_none() && site.password_env.is_none() {
                return Err(invalid(
                    "password",
                    format!("password or passwordEnv is required for site {label}"),
                ));
            }
            if site.ip.trim().is_empty() {
                return Err(invalid("ip", format!("is required for site {label}")));
            }
            if site.local_id_field.trim().is_empty() {
                return Err(invalid("localIDField", format!("is required for site {label}")));
            }
            if site.refresh_interval.is_zero() {
                return Err(invalid(
                    "refreshInterval",
                    format!("must be greater than zero for site {label}"),
                ));
            }
            for door in &site.openable_doors {
                if door.sequence.is_empty() {
                    return Err(invalid(
                        "openableDoors",
                        format!("'{}' on site {label} has an empty sequence", door.name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Translate every site into a core `SiteConfig`, resolving passwords.
    pub fn site_configs(&self) -> Result<Vec<SiteConfig>, ConfigError> {
        self.sites
            .iter()
            .enumerate()
            .map(|(index, site)| site.to_site_config(&self.client_id, index))
            .collect()
    }
}

impl SiteEntry {
    fn label(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("#{}", index + 1)
        } else {
            format!("'{}'", self.name)
        }
    }

    /// The server root URL.
    pub fn url(&self) -> Result<url::Url, ConfigError> {
        let scheme = if self.https { "https" } else { "http" };
        let raw = format!("{scheme}://{}:{}", self.ip.trim(), self.port);
        raw.parse()
            .map_err(|e| invalid("ip", format!("{raw} is not a valid URL: {e}")))
    }

    fn password(&self, label: &str) -> Result<SecretString, ConfigError> {
        if let Some(ref var) = self.password_env {
            if let Ok(value) = std::env::var(var) {
                return Ok(SecretString::from(value));
            }
        }
        if let Some(ref password) = self.password {
            return Ok(SecretString::from(password.clone()));
        }
        Err(invalid(
            "password",
            format!(
                "environment variable {} is not set for site {label}",
                self.password_env.as_deref().unwrap_or_default()
            ),
        ))
    }

    fn tls(&self) -> TlsVerification {
        if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else {
            TlsVerification::SystemDefaults
        }
    }

    fn to_site_config(&self, client_id: &str, index: usize) -> Result<SiteConfig, ConfigError> {
        let label = self.label(index);
        let id = self
            .id
            .ok_or_else(|| invalid("id", format!("is required for site {label}")))?;

        let mut config = SiteConfig::new(
            id,
            self.name.clone(),
            self.url()?,
            SiteCredentials {
                client_id: client_id.to_owned(),
                username: self.username.clone(),
                password: self.password(&label)?,
            },
        );
        config.tls = self.tls();
        config.timeout = self.timeout;
        config.refresh_interval = self.refresh_interval;
        config.local_id_field.clone_from(&self.local_id_field);
        config.department_prefixes = DepartmentPrefixes {
            staff: self.staff_department_prefix.clone(),
            visitors: self.visitor_department_prefix.clone(),
            contractors: self.contractor_department_prefix.clone(),
            cleaners: self.cleaner_department_prefix.clone(),
            customers: self.customer_department_prefix.clone(),
            cancelled: self.cancelled_department_prefix.clone(),
        };
        config.monitored_doors = self
            .monitored_doors
            .iter()
            .map(|door| MonitoredDoor {
                id: door.id,
                name: door.name.clone(),
                zone: door.zone.clone(),
            })
            .collect();
        config.openable_doors = self
            .openable_doors
            .iter()
            .map(|door| OpenableDoor {
                name: door.name.clone(),
                sequence: door
                    .sequence
                    .iter()
                    .map(|step| DoorSequenceItem::new(step.id, step.duration))
                    .collect(),
            })
            .collect();
        Ok(config)
    }
}
