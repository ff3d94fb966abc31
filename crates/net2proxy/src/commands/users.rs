//! `net2proxy users ...`: list cached users by group and run user commands.

use serde::Serialize;
use tabled::Tabled;

use net2_core::{Subsystem, User};

use crate::cli::{GlobalOpts, UsersCommand};
use crate::error::CliError;
use crate::output;

const DATE_DISPLAY: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Tabled, Serialize)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Departments")]
    departments: String,
    #[tabled(rename = "Expires")]
    expiry: String,
    #[tabled(rename = "Last access")]
    last_access: String,
    #[tabled(rename = "Local ID")]
    local_id: String,
    #[tabled(rename = "Access levels")]
    access_levels: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            departments: user
                .departments
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            expiry: user
                .expiry
                .map_or_else(|| "never".into(), |at| at.format(DATE_DISPLAY).to_string()),
            last_access: user
                .last_access
                .map(|at| at.format(DATE_DISPLAY).to_string())
                .unwrap_or_default(),
            local_id: user.local_id.clone().unwrap_or_default(),
            access_levels: user.access_levels.join(", "),
        }
    }
}

pub async fn handle(cmd: UsersCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        UsersCommand::List {
            site,
            group,
            activity,
        } => {
            let site = super::open_site(global, site.site)?;
            // Level names and departments feed the user rows.
            let report = site.refresh_all().await;
            if report.failed.contains(&Subsystem::Users) {
                return Err(CliError::SyncIncomplete {
                    sites: site.id().to_string(),
                });
            }
            let rows: Vec<UserRow> = site
                .users_in(group, activity)
                .iter()
                .map(|user| UserRow::from(user.as_ref()))
                .collect();
            output::print_output(&output::render_list(global.output, &rows)?);
            Ok(())
        }

        UsersCommand::Activate { site, user } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_user(user).await?;
            site.activate_user(user).await?;
            eprintln!("User {user} activated");
            Ok(())
        }

        UsersCommand::Deactivate { site, user } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_user(user).await?;
            site.deactivate_user(user).await?;
            eprintln!("User {user} deactivated");
            Ok(())
        }

        UsersCommand::ResetAntiPassback { site, user } => {
            let site = super::open_site(global, site.site)?;
            site.refresh_user(user).await?;
            site.reset_anti_passback(user).await?;
            eprintln!("Anti-passback reset for user {user}");
            Ok(())
        }
    }
}
