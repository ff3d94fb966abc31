//! `net2proxy run`: start every site and keep refreshing until a shutdown
//! signal arrives.

use tracing::{info, warn};

use net2_core::SiteManager;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let configs = super::load_site_configs(global)?;
    if configs.is_empty() {
        warn!(config = %global.config.display(), "no sites configured");
    }

    let manager = SiteManager::from_configs(configs)?;
    manager.start().await?;

    for site in manager.sites() {
        let config = site.config();
        info!(
            site = site.id(),
            name = site.name(),
            url = %config.url,
            refresh = %humantime::format_duration(config.refresh_interval),
            "site loaded"
        );
    }
    info!(count = manager.count(), "sites started");

    shutdown_signal().await;
    info!("shutting down");
    manager.stop().await;
    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
