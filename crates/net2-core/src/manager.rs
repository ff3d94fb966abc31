// ── Site manager ──
//
// Registry of every configured site. Reads are only answered once the
// manager has been started; before that (and after `stop`) they come back
// empty, mirroring a proxy that hasn't finished booting.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::SiteConfig;
use crate::error::CoreError;
use crate::site::{RefreshReport, Site};

// ── ManagerState ────────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ManagerState {
    NotStarted,
    Started,
    Stopped,
}

// ── SiteManager ─────────────────────────────────────────────────────

pub struct SiteManager {
    sites: BTreeMap<i64, Arc<Site>>,
    state: watch::Sender<ManagerState>,
}

impl SiteManager {
    /// Register sites. Later duplicates of a site ID replace earlier ones.
    pub fn new(sites: impl IntoIterator<Item = Arc<Site>>) -> Self {
        let sites = sites.into_iter().map(|s| (s.id(), s)).collect();
        let (state, _) = watch::channel(ManagerState::NotStarted);
        Self { sites, state }
    }

    /// Build a site per configuration entry.
    pub fn from_configs(configs: impl IntoIterator<Item = SiteConfig>) -> Result<Self, CoreError> {
        let sites = configs
            .into_iter()
            .map(Site::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(sites))
    }

    /// Start every site's refresh schedule.
    ///
    /// Sites that start stay started even if others fail; the manager only
    /// moves to [`ManagerState::Started`] when all of them succeed.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.is_started() {
            return Ok(());
        }
        info!(sites = self.sites.len(), "starting sites");

        let mut failed = Vec::new();
        for site in self.sites.values() {
            debug!(site = site.id(), name = site.name(), "starting site");
            match site.start().await {
                Ok(()) | Err(CoreError::AlreadyStarted { .. }) => {}
                Err(e) => {
                    error!(site = site.id(), error = %e, "unable to start site");
                    failed.push(site.id());
                }
            }
        }

        if !failed.is_empty() {
            return Err(CoreError::SitesFailedToStart { failed });
        }
        self.state.send_replace(ManagerState::Started);
        Ok(())
    }

    /// Stop every site's schedule, including sites left running by a
    /// partially failed `start`. A no-op once stopped.
    pub async fn stop(&self) {
        if self.state() == ManagerState::Stopped {
            return;
        }
        join_all(self.sites.values().map(|site| site.stop())).await;
        self.state.send_replace(ManagerState::Stopped);
        info!("sites stopped");
    }

    pub fn state(&self) -> ManagerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ManagerState> {
        self.state.subscribe()
    }

    pub fn is_started(&self) -> bool {
        self.state() == ManagerState::Started
    }

    pub fn site(&self, id: i64) -> Option<Arc<Site>> {
        if !self.is_started() {
            return None;
        }
        self.sites.get(&id).cloned()
    }

    /// Like [`site`](Self::site) but with an error naming the problem.
    pub fn require_site(&self, id: i64) -> Result<Arc<Site>, CoreError> {
        if !self.is_started() {
            return Err(CoreError::NotStarted);
        }
        self.sites
            .get(&id)
            .cloned()
            .ok_or(CoreError::SiteNotFound { id })
    }

    /// All sites ordered by ID.
    pub fn sites(&self) -> Vec<Arc<Site>> {
        if !self.is_started() {
            return Vec::new();
        }
        self.sites.values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        if !self.is_started() {
            return 0;
        }
        self.sites.len()
    }

    /// Refresh every site concurrently and wait for all of them.
    ///
    /// A failure on one site never affects the others. Returns reports
    /// ordered by site ID; empty when not started.
    pub async fn update_all(&self) -> Vec<(i64, RefreshReport)> {
        if !self.is_started() {
            return Vec::new();
        }
        refresh_sites(self.sites.values().cloned().collect()).await
    }

    /// Start [`update_all`](Self::update_all) in the background.
    pub fn trigger_update_all(&self) -> Option<JoinHandle<Vec<(i64, RefreshReport)>>> {
        if !self.is_started() {
            return None;
        }
        let sites: Vec<Arc<Site>> = self.sites.values().cloned().collect();
        Some(tokio::spawn(refresh_sites(sites)))
    }
}

async fn refresh_sites(sites: Vec<Arc<Site>>) -> Vec<(i64, RefreshReport)> {
    let mut tasks = JoinSet::new();
    for site in sites {
        tasks.spawn(async move { (site.id(), site.refresh_all().await) });
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => warn!(error = %e, "site refresh task failed"),
        }
    }
    reports.sort_by_key(|(id, _)| *id);
    reports
}
