//! `net2proxy check`: validate the config without contacting any server.

use serde::Serialize;
use tabled::Tabled;

use net2_core::{SiteConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Tabled, Serialize)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Refresh")]
    refresh: String,
    #[tabled(rename = "TLS")]
    tls: String,
    #[tabled(rename = "Local ID field")]
    local_id_field: String,
    #[tabled(rename = "Monitored")]
    monitored_doors: usize,
    #[tabled(rename = "Openable doors")]
    openable_doors: String,
}

impl From<&SiteConfig> for SiteRow {
    fn from(config: &SiteConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            url: config.url.to_string(),
            refresh: humantime::format_duration(config.refresh_interval).to_string(),
            tls: match config.tls {
                TlsVerification::SystemDefaults => "system".into(),
                TlsVerification::CustomCa(ref path) => format!("ca: {}", path.display()),
                TlsVerification::DangerAcceptInvalid => "insecure".into(),
            },
            local_id_field: config.local_id_field.clone(),
            monitored_doors: config.monitored_doors.len(),
            openable_doors: config
                .openable_doors
                .iter()
                .map(|door| door.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let configs = super::load_site_configs(global)?;
    let rows: Vec<SiteRow> = configs.iter().map(SiteRow::from).collect();
    output::print_output(&output::render_list(global.output, &rows)?);
    Ok(())
}
