//! `net2proxy door ...`: list doors and relay door commands to one site.

use serde::Serialize;
use tabled::Tabled;

use net2_core::{Door, Relay};

use crate::cli::{DoorCommand, GlobalOpts, RelayArg};
use crate::error::CliError;
use crate::output::{self, flag};

#[derive(Debug, Tabled, Serialize)]
struct DoorRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Open")]
    open: &'static str,
    #[tabled(rename = "Alarm")]
    alarm: &'static str,
    #[tabled(rename = "Tamper")]
    tamper: &'static str,
    #[tabled(rename = "PSU fault")]
    psu_fault: &'static str,
}

impl From<&Door> for DoorRow {
    fn from(door: &Door) -> Self {
        Self {
            id: door.id,
            name: door.name.clone(),
            zone: door.zone.clone().unwrap_or_default(),
            open: flag(door.status.is_open()),
            alarm: flag(door.alarm),
            tamper: flag(!door.status.tamper_good()),
            psu_fault: flag(!door.status.psu_ok()),
        }
    }
}

impl From<RelayArg> for Relay {
    fn from(arg: RelayArg) -> Self {
        match arg {
            RelayArg::Relay1 => Relay::Relay1,
            RelayArg::Relay2 => Relay::Relay2,
        }
    }
}

pub async fn handle(cmd: DoorCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        DoorCommand::List { site, monitored } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_doors().await?;
            let rows: Vec<DoorRow> = if monitored {
                site.monitored_doors().iter().map(DoorRow::from).collect()
            } else {
                site.doors().iter().map(|door| DoorRow::from(door.as_ref())).collect()
            };
            output::print_output(&output::render_list(global.output, &rows)?);
            Ok(())
        }

        DoorCommand::Open { site, door, relay } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_doors().await?;
            match relay {
                Some(relay) => site.open_door_with_relay(door, relay.into()).await?,
                None => site.open_door(door).await?,
            }
            eprintln!("Door {door} opened");
            Ok(())
        }

        DoorCommand::Close { site, door } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_doors().await?;
            site.close_door(door).await?;
            eprintln!("Door {door} closed");
            Ok(())
        }

        DoorCommand::Sequence { site, name } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_doors().await?;
            site.run_openable_sequence(&name)?
                .await
                .map_err(|e| CliError::OperationFailed {
                    message: format!("Sequence '{name}' did not finish: {e}"),
                })?;
            eprintln!("Sequence '{name}' finished");
            Ok(())
        }
    }
}
