//! Command dispatch: loads the config, builds sites, formats results.

pub mod check;
pub mod door;
pub mod run;
pub mod sync;
pub mod users;

use std::sync::Arc;

use net2_core::{Site, SiteConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(global).await,
        Command::Check => check::handle(global),
        Command::Sync(args) => sync::handle(args, global).await,
        Command::Door(cmd) => door::handle(cmd, global).await,
        Command::Users(cmd) => users::handle(cmd, global).await,
    }
}

/// Load, validate and translate the config file.
pub fn load_site_configs(global: &GlobalOpts) -> Result<Vec<SiteConfig>, CliError> {
    let path = global.config.as_path();
    net2_config::load_config(path)
        .and_then(|config| config.site_configs())
        .map_err(|err| CliError::from_config(path, err))
}

/// Build the site with `id` from the config file, without starting it.
pub fn open_site(global: &GlobalOpts, id: i64) -> Result<Arc<Site>, CliError> {
    let config = load_site_configs(global)?
        .into_iter()
        .find(|config| config.id == id)
        .ok_or(net2_core::CoreError::SiteNotFound { id })?;
    Ok(Site::new(config)?)
}
