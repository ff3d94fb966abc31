//! `net2proxy sync`: one full refresh of every configured site.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tabled::Tabled;

use net2_core::{RefreshReport, Site};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::{CliError, join_ids};
use crate::output;

#[derive(Debug, Tabled, Serialize)]
struct SyncRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Users")]
    users: usize,
    #[tabled(rename = "Doors")]
    doors: usize,
    #[tabled(rename = "Departments")]
    departments: usize,
    #[tabled(rename = "Access levels")]
    access_levels: usize,
    #[tabled(rename = "Status")]
    status: String,
}

impl SyncRow {
    fn new(site: &Site, report: &RefreshReport) -> Self {
        let status = if report.is_complete() {
            "ok".to_owned()
        } else {
            let failed: Vec<String> = report.failed.iter().map(ToString::to_string).collect();
            format!("failed: {}", failed.join(", "))
        };
        Self {
            id: site.id(),
            name: site.name().to_owned(),
            users: site.users().len(),
            doors: site.doors().len(),
            departments: site.departments().len(),
            access_levels: site.access_levels().len(),
            status,
        }
    }
}

pub async fn handle(args: SyncArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let sites: Vec<Arc<Site>> = match args.site {
        Some(id) => vec![super::open_site(global, id)?],
        None => super::load_site_configs(global)?
            .into_iter()
            .map(Site::new)
            .collect::<Result<_, net2_core::CoreError>>()?,
    };

    let reports = join_all(sites.iter().map(|site| site.refresh_all())).await;

    let rows: Vec<SyncRow> = sites
        .iter()
        .zip(&reports)
        .map(|(site, report)| SyncRow::new(site, report))
        .collect();
    output::print_output(&output::render_list(global.output, &rows)?);

    let incomplete: Vec<i64> = sites
        .iter()
        .zip(&reports)
        .filter(|(_, report)| !report.is_complete())
        .map(|(site, _)| site.id())
        .collect();
    if incomplete.is_empty() {
        Ok(())
    } else {
        Err(CliError::SyncIncomplete {
            sites: join_ids(&incomplete),
        })
    }
}
