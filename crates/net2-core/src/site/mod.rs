// ── Site: one mirrored Net2 server ──
//
// Owns the API client, the cache, the refresh lock and the refresh
// schedule for a single tenant. Every refresh and every command-driven
// cache write for a site happens under `refresh_lock`.

mod commands;
mod views;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::NaiveDateTime;
use net2_api::{Credentials, Net2Client, TlsMode, TransportConfig, UserRow};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{Instrument, debug, info, info_span, warn};

pub use commands::ExpiryChange;
pub use views::{Activity, UserGroup, photo_needed};

use crate::clock::{Clock, SystemClock};
use crate::config::{SiteConfig, TlsVerification};
use crate::convert;
use crate::error::CoreError;
use crate::model::User;
use crate::scheduler::SchedulerHandle;
use crate::store::SiteCache;

/// The four independently refreshed collections of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Subsystem {
    AccessLevels,
    Doors,
    Departments,
    Users,
}

/// Outcome of one full refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Subsystems whose fetch failed this cycle.
    pub failed: Vec<Subsystem>,
    /// Local time of completion, set only when every subsystem succeeded.
    pub completed_at: Option<NaiveDateTime>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A single Net2 site and its cached state.
pub struct Site {
    config: SiteConfig,
    client: Net2Client,
    cache: SiteCache,
    refresh_lock: Mutex<()>,
    /// `UsersEx` column holding the local identifier, once resolved.
    local_id_column: ArcSwapOption<String>,
    clock: Arc<dyn Clock>,
    span: tracing::Span,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("id", &self.config.id)
            .field("name", &self.config.name)
            .field("url", &self.config.url.as_str())
            .finish_non_exhaustive()
    }
}

impl Site {
    /// Build a site using the system clock.
    pub fn new(config: SiteConfig) -> Result<Arc<Self>, CoreError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a site reading local time from `clock`.
    pub fn with_clock(config: SiteConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, CoreError> {
        let client = Net2Client::new(
            config.url.clone(),
            credentials(&config),
            &build_transport(&config),
        )?;
        Ok(Self::with_client(config, client, clock))
    }

    /// Build a site around an existing API client.
    pub fn with_client(config: SiteConfig, client: Net2Client, clock: Arc<dyn Clock>) -> Arc<Self> {
        let span = info_span!("site", id = config.id, name = %config.name);
        Arc::new(Self {
            config,
            client,
            cache: SiteCache::new(),
            refresh_lock: Mutex::new(()),
            local_id_column: ArcSwapOption::empty(),
            clock,
            span,
            scheduler: Mutex::new(None),
        })
    }

    pub fn id(&self) -> i64 {
        self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Resolve the local-ID column and arm the refresh schedule.
    ///
    /// The first refresh starts immediately in the background. Fails if
    /// the site is already started, the refresh interval is zero, or no
    /// tokio runtime is available.
    pub async fn start(self: &Arc<Self>) -> Result<(), CoreError> {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(SchedulerHandle::is_running) {
            return Err(CoreError::AlreadyStarted { site: self.id() });
        }

        self.resolve_local_id_column()
            .instrument(self.span.clone())
            .await;

        let handle = SchedulerHandle::spawn(
            Arc::downgrade(self),
            self.config.refresh_interval,
            self.span.clone(),
        )?;
        *scheduler = Some(handle);
        info!(parent: &self.span, interval = ?self.config.refresh_interval, "site started");
        Ok(())
    }

    /// Stop the refresh schedule. Cached data stays readable.
    pub async fn stop(&self) {
        if let Some(handle) = self.scheduler.lock().await.take() {
            handle.stop().await;
            info!(parent: &self.span, "site stopped");
        }
    }

    pub async fn is_started(&self) -> bool {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(SchedulerHandle::is_running)
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Refresh access levels, doors, departments and users, in that order.
    ///
    /// Each step is attempted even if an earlier one failed. The refresh
    /// timestamp only advances when all four succeed.
    pub async fn refresh_all(&self) -> RefreshReport {
        async {
            let _guard = self.refresh_lock.lock().await;
            let started = std::time::Instant::now();
            debug!("starting full refresh");

            self.resolve_local_id_column().await;

            let mut report = RefreshReport::default();
            if let Err(e) = self.fetch_access_levels().await {
                warn!(error = %e, "access level refresh failed");
                report.failed.push(Subsystem::AccessLevels);
            }
            if let Err(e) = self.fetch_doors().await {
                warn!(error = %e, "door refresh failed");
                report.failed.push(Subsystem::Doors);
            }
            if let Err(e) = self.fetch_departments().await {
                warn!(error = %e, "department refresh failed");
                report.failed.push(Subsystem::Departments);
            }
            if let Err(e) = self.fetch_users(None).await {
                warn!(error = %e, "user refresh failed");
                report.failed.push(Subsystem::Users);
            }

            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            if report.is_complete() {
                let now = self.clock.now();
                self.cache.mark_refreshed(now);
                report.completed_at = Some(now);
                debug!(elapsed_ms, "full refresh complete");
            } else {
                info!(elapsed_ms, failed = ?report.failed, "full refresh incomplete");
            }
            report
        }
        .instrument(self.span.clone())
        .await
    }

    /// Refresh only the access level table.
    pub async fn refresh_access_levels(&self) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_access_levels()
            .instrument(self.span.clone())
            .await
    }

    /// Refresh only the door list.
    pub async fn refresh_doors(&self) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_doors().instrument(self.span.clone()).await
    }

    /// Refresh only the department list.
    pub async fn refresh_departments(&self) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_departments()
            .instrument(self.span.clone())
            .await
    }

    /// Refresh all active users.
    pub async fn refresh_users(&self) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        async {
            self.resolve_local_id_column().await;
            self.fetch_users(None).await
        }
        .instrument(self.span.clone())
        .await
        .map(|_| ())
    }

    /// Re-read one user, whether active or not.
    pub async fn refresh_user(&self, user_id: i64) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;
        async {
            self.resolve_local_id_column().await;
            self.fetch_users(Some(user_id)).await
        }
        .instrument(self.span.clone())
        .await
        .map(|_| ())
    }

    /// When the last fully successful refresh finished.
    pub fn last_successful_refresh(&self) -> Option<NaiveDateTime> {
        self.cache.last_successful_refresh()
    }

    /// Watch successive refresh completions.
    pub fn subscribe_refresh(&self) -> watch::Receiver<Option<NaiveDateTime>> {
        self.cache.subscribe_refresh()
    }

    /// Whether a full refresh succeeded within `max_age`.
    pub fn is_up_to_date(&self, max_age: Duration) -> bool {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return true;
        };
        self.last_successful_refresh()
            .is_some_and(|at| self.clock.now() - at <= max_age)
    }

    // ── Fetch steps (caller holds `refresh_lock`) ───────────────────

    async fn resolve_local_id_column(&self) {
        if self.local_id_column.load().is_some() || self.config.local_id_field.is_empty() {
            return;
        }
        match self.client.custom_field_names().await {
            Ok(fields) => {
                match convert::local_id_column(&fields, &self.config.local_id_field) {
                    Some(column) => {
                        debug!(column = %column, "resolved local id column");
                        self.local_id_column.store(Some(Arc::new(column)));
                    }
                    None => warn!(
                        field = %self.config.local_id_field,
                        "local id field not found among custom fields"
                    ),
                }
            }
            Err(e) => warn!(error = %e, "unable to read custom field names"),
        }
    }

    async fn fetch_access_levels(&self) -> Result<(), CoreError> {
        let (levels, areas) =
            tokio::try_join!(self.client.list_access_levels(), self.client.list_areas())?;
        let merged = convert::merge_access_levels(levels, areas);
        debug!(count = merged.len(), "access levels fetched");
        self.cache.apply_access_levels(merged);
        Ok(())
    }

    async fn fetch_doors(&self) -> Result<(), CoreError> {
        let (records, status) =
            tokio::try_join!(self.client.list_doors(), self.client.device_status())?;
        let doors = convert::doors_from(records, &status, &self.config.monitored_doors);
        debug!(count = doors.len(), "doors fetched");
        self.cache.apply_doors(doors);
        Ok(())
    }

    async fn fetch_departments(&self) -> Result<(), CoreError> {
        let departments = self.client.list_departments().await?;
        debug!(count = departments.len(), "departments fetched");
        self.cache
            .apply_departments(departments.into_iter().map(Into::into).collect());
        Ok(())
    }

    /// Fetch all active users, or one user by ID.
    async fn fetch_users(&self, only: Option<i64>) -> Result<usize, CoreError> {
        let column = self.local_id_column.load_full();
        let sql = convert::users_query(column.as_deref().map(String::as_str), only);
        let rows = self.client.query_users(&sql).await?;

        let level_names: HashMap<i64, String> = self
            .cache
            .access_levels
            .snapshot()
            .iter()
            .map(|l| (l.id, l.name.clone()))
            .collect();

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            let levels = self.user_access_levels(&row, &level_names).await;
            users.push(convert::user_from_row(row, levels));
        }

        let count = users.len();
        debug!(count, "users fetched");
        self.cache.apply_users(users);
        Ok(count)
    }

    /// Access level names for a row, fetching the exact permission set
    /// when the row only carries a placeholder. On failure the names
    /// cached from the last good fetch are kept.
    async fn user_access_levels(
        &self,
        row: &UserRow,
        level_names: &HashMap<i64, String>,
    ) -> Vec<String> {
        if !convert::needs_permission_set(row) {
            return convert::plain_access_levels(row);
        }
        match self.client.door_permission_set(row.id).await {
            Ok(permissions) => {
                convert::resolve_permission_names(row.id, &permissions, level_names)
            }
            Err(e) => {
                warn!(user = row.id, error = %e, "unable to fetch permission set");
                self.cache
                    .users
                    .get(row.id)
                    .map(|u| u.access_levels.clone())
                    .filter(|levels| !levels.is_empty())
                    .unwrap_or_else(|| convert::plain_access_levels(row))
            }
        }
    }

    /// Replace a cached user with a locally edited copy.
    fn write_through(&self, user_id: i64, edit: impl FnOnce(&mut User)) {
        if let Some(existing) = self.cache.users.get(user_id) {
            let mut user = (*existing).clone();
            edit(&mut user);
            self.cache.users.upsert(user_id, user);
        }
    }
}

fn credentials(config: &SiteConfig) -> Credentials {
    Credentials {
        client_id: config.credentials.client_id.clone(),
        username: config.credentials.username.clone(),
        password: config.credentials.password.clone(),
    }
}

fn build_transport(config: &SiteConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
