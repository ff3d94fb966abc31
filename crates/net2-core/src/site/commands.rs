// ── Commands relayed to the Net2 server ──
//
// Door commands and user mutations. Every command checks the target in
// the cache first, so unknown IDs never reach the server. Remote failures
// are logged here and surfaced as generic operation errors. Successful
// user mutations are written through to the cache, then the user is
// re-read under the refresh lock.

use std::sync::Arc;

use chrono::NaiveDateTime;
use net2_api::{AreaPermission, DepartmentRecord, PermissionSet, Relay, UserUpdate};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use super::Site;
use crate::clock::{tomorrow_end_of_day, yesterday_end_of_day};
use crate::error::CoreError;
use crate::model::{AREA_ID_OFFSET, Door, DoorSequenceItem, User};

/// How a user update treats the expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryChange {
    /// Resend the cached expiry.
    #[default]
    Keep,
    /// Clear the expiry.
    Never,
    At(NaiveDateTime),
}

impl ExpiryChange {
    fn resolve(self, current: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
        match self {
            Self::Keep => current,
            Self::Never => None,
            Self::At(at) => Some(at),
        }
    }
}

impl From<Option<NaiveDateTime>> for ExpiryChange {
    fn from(expiry: Option<NaiveDateTime>) -> Self {
        expiry.map_or(Self::Never, Self::At)
    }
}

impl Site {
    // ── Doors ────────────────────────────────────────────────────────

    fn require_door(&self, door_id: i64) -> Result<Arc<Door>, CoreError> {
        self.cache.doors.get(door_id).ok_or(CoreError::DoorNotFound {
            site: self.id(),
            door: door_id,
        })
    }

    fn door_outcome(
        &self,
        door_id: i64,
        action: &'static str,
        result: Result<(), net2_api::Error>,
    ) -> Result<(), CoreError> {
        match result {
            Ok(()) => {
                info!(parent: &self.span, door = door_id, action, "door command sent");
                Ok(())
            }
            Err(e) => {
                error!(parent: &self.span, door = door_id, action, error = %e, "door command failed");
                Err(CoreError::DoorOperation {
                    door: door_id,
                    action,
                })
            }
        }
    }

    pub async fn open_door(&self, door_id: i64) -> Result<(), CoreError> {
        self.require_door(door_id)?;
        let result = self.client.open_door(door_id).await;
        self.door_outcome(door_id, "open", result)
    }

    pub async fn close_door(&self, door_id: i64) -> Result<(), CoreError> {
        self.require_door(door_id)?;
        let result = self.client.close_door(door_id).await;
        self.door_outcome(door_id, "close", result)
    }

    /// Pulse one relay of the door controller for the standard open time.
    pub async fn open_door_with_relay(&self, door_id: i64, relay: Relay) -> Result<(), CoreError> {
        self.require_door(door_id)?;
        let result = self.client.control_door(door_id, relay).await;
        self.door_outcome(door_id, "open", result)
    }

    /// Open each door in order, waiting after each one. A failed door is
    /// logged and the sequence carries on.
    pub async fn sequence_doors(&self, items: &[DoorSequenceItem]) {
        for item in items {
            if let Err(e) = self.open_door(item.door).await {
                warn!(parent: &self.span, door = item.door, error = %e, "door sequence step failed");
            }
            if !item.wait.is_zero() {
                tokio::time::sleep(item.wait).await;
            }
        }
        debug!(parent: &self.span, steps = items.len(), "door sequence finished");
    }

    /// Run a door sequence in the background.
    pub fn spawn_sequence(self: &Arc<Self>, items: Vec<DoorSequenceItem>) -> JoinHandle<()> {
        let site = Arc::clone(self);
        let span = self.span.clone();
        tokio::spawn(async move { site.sequence_doors(&items).await }.instrument(span))
    }

    /// Run the configured openable door called `name` in the background.
    pub fn run_openable_sequence(self: &Arc<Self>, name: &str) -> Result<JoinHandle<()>, CoreError> {
        let items = self.openable_door(name)?.sequence.clone();
        Ok(self.spawn_sequence(items))
    }

    // ── Users ────────────────────────────────────────────────────────

    fn require_user(&self, user_id: i64) -> Result<Arc<User>, CoreError> {
        self.cache.users.get(user_id).ok_or(CoreError::UserNotFound {
            site: self.id(),
            user: user_id.to_string(),
        })
    }

    /// Apply the outcome of a remote user mutation to the cache.
    async fn finish_user_command(
        &self,
        user_id: i64,
        action: &'static str,
        result: Result<(), net2_api::Error>,
        edit: impl FnOnce(&mut User),
    ) -> Result<(), CoreError> {
        if let Err(e) = result {
            error!(parent: &self.span, user = user_id, action, error = %e, "user command failed");
            return Err(CoreError::UserUpdate { user: user_id });
        }

        let _guard = self.refresh_lock.lock().await;
        self.write_through(user_id, edit);
        if let Err(e) = self
            .fetch_users(Some(user_id))
            .instrument(self.span.clone())
            .await
        {
            warn!(parent: &self.span, user = user_id, error = %e, "unable to re-read user");
        }
        info!(parent: &self.span, user = user_id, action, "user updated");
        Ok(())
    }

    /// Extend the user's expiry to the end of tomorrow.
    pub async fn activate_user(&self, user_id: i64) -> Result<(), CoreError> {
        let expiry = tomorrow_end_of_day(self.clock.now());
        self.update_user_expiry(user_id, ExpiryChange::At(expiry))
            .await
    }

    /// Expire the user at the end of yesterday.
    pub async fn deactivate_user(&self, user_id: i64) -> Result<(), CoreError> {
        let expiry = yesterday_end_of_day(self.clock.now());
        self.update_user_expiry(user_id, ExpiryChange::At(expiry))
            .await
    }

    pub async fn update_user_expiry(
        &self,
        user_id: i64,
        expiry: ExpiryChange,
    ) -> Result<(), CoreError> {
        self.update_user_info(user_id, None, None, expiry).await
    }

    /// Update name fields and expiry. `None` names are left untouched.
    pub async fn update_user_info(
        &self,
        user_id: i64,
        first_name: Option<String>,
        surname: Option<String>,
        expiry: ExpiryChange,
    ) -> Result<(), CoreError> {
        let user = self.require_user(user_id)?;
        let update = UserUpdate {
            id: user_id,
            first_name,
            last_name: surname,
            expiry_date: expiry.resolve(user.expiry),
        };
        let result = self.client.update_user(&update).await;

        self.finish_user_command(user_id, "update", result, |user| {
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(surname) = update.last_name {
                user.surname = surname;
            }
            user.expiry = update.expiry_date;
        })
        .await
    }

    /// Set name, expiry and a single access level in one go. A missing or
    /// negative level removes all access.
    pub async fn update_user_name_and_expiry_and_access_level(
        &self,
        user_id: i64,
        first_name: String,
        surname: String,
        expiry: Option<NaiveDateTime>,
        level: Option<i64>,
    ) -> Result<(), CoreError> {
        self.update_user_info(
            user_id,
            Some(first_name),
            Some(surname),
            ExpiryChange::from(expiry),
        )
        .await?;
        let level = level.filter(|l| *l >= 0).unwrap_or(0);
        self.set_access_levels(user_id, &[level]).await
    }

    /// Move the user into a cached department.
    pub async fn change_department(
        &self,
        user_id: i64,
        department_id: i64,
    ) -> Result<(), CoreError> {
        self.require_user(user_id)?;
        let department = self.cache.departments.get(department_id).ok_or(
            CoreError::DepartmentNotFound {
                site: self.id(),
                department: department_id,
            },
        )?;

        let result = self
            .client
            .set_user_department(user_id, &DepartmentRecord::from(department.as_ref()))
            .await;
        self.finish_user_command(user_id, "change department", result, |user| {
            user.departments = vec![(*department).clone()];
        })
        .await
    }

    /// Replace the user's permissions with exactly `level_ids`.
    ///
    /// IDs at or above [`AREA_ID_OFFSET`] are sent as individual areas.
    pub async fn set_access_levels(&self, user_id: i64, level_ids: &[i64]) -> Result<(), CoreError> {
        self.require_user(user_id)?;
        let permissions = permission_set(level_ids);
        let result = self
            .client
            .set_door_permission_set(user_id, &permissions)
            .await;

        let names: Vec<String> = level_ids
            .iter()
            .filter_map(|id| self.cache.access_levels.get(*id).map(|l| l.name.clone()))
            .collect();
        self.finish_user_command(user_id, "set access levels", result, |user| {
            user.access_levels = names;
        })
        .await
    }

    pub async fn set_access_level(&self, user_id: i64, level_id: i64) -> Result<(), CoreError> {
        self.set_access_levels(user_id, &[level_id]).await
    }

    pub async fn add_access_level(&self, user_id: i64, level_id: i64) -> Result<(), CoreError> {
        let user = self.require_user(user_id)?;
        let mut levels = self.current_level_ids(&user);
        if !levels.contains(&level_id) {
            levels.push(level_id);
        }
        self.set_access_levels(user_id, &levels).await
    }

    pub async fn remove_access_level(&self, user_id: i64, level_id: i64) -> Result<(), CoreError> {
        let user = self.require_user(user_id)?;
        let mut levels = self.current_level_ids(&user);
        levels.retain(|id| *id != level_id);
        self.set_access_levels(user_id, &levels).await
    }

    pub async fn reset_anti_passback(&self, user_id: i64) -> Result<(), CoreError> {
        self.require_user(user_id)?;
        let result = self.client.reset_anti_passback(user_id).await;
        self.finish_user_command(user_id, "reset anti-passback", result, |_| {})
            .await
    }

    /// Map the user's cached level names back to IDs.
    fn current_level_ids(&self, user: &User) -> Vec<i64> {
        user.access_levels
            .iter()
            .filter_map(|name| {
                let id = self.cache.access_level_id(name);
                if id.is_none() {
                    warn!(parent: &self.span, user = user.id, level = %name, "dropping unknown access level");
                }
                id
            })
            .collect()
    }
}

fn permission_set(level_ids: &[i64]) -> PermissionSet {
    let (areas, levels): (Vec<i64>, Vec<i64>) =
        level_ids.iter().copied().partition(|id| *id >= AREA_ID_OFFSET);
    PermissionSet {
        access_levels: levels,
        individual_permissions: areas
            .into_iter()
            .map(|id| AreaPermission {
                area_id: id - AREA_ID_OFFSET,
            })
            .collect(),
    }
}
