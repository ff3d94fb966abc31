// ── Read-side views over the site cache ──
//
// Everything here is a snapshot read. Users are classified by the
// department-name prefixes configured for the site.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Site;
use crate::config::{DepartmentPrefixes, OpenableDoor};
use crate::error::CoreError;
use crate::model::{AccessLevel, Department, Door, UnknownTokenEvent, User};

static PHOTO_NEEDED: &[u8] = include_bytes!("../../assets/photo-needed.png");
static BLANK_GIF: &[u8] = include_bytes!("../../assets/blank.gif");

/// Population a user view is drawn from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UserGroup {
    All,
    Staff,
    Visitors,
    Contractors,
    Cleaners,
    Customers,
    Cancelled,
    /// Active users with at least one department outside the staff prefix.
    NonStaff,
}

/// Activity filter applied on top of a [`UserGroup`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Activity {
    #[default]
    Any,
    /// Not expired as of today's midnight.
    Active,
    /// Badged in since today's midnight.
    ActiveToday,
}

impl DepartmentPrefixes {
    /// The configured prefix for a department-backed group.
    pub fn prefix(&self, group: UserGroup) -> Option<&str> {
        let prefix = match group {
            UserGroup::Staff => &self.staff,
            UserGroup::Visitors => &self.visitors,
            UserGroup::Contractors => &self.contractors,
            UserGroup::Cleaners => &self.cleaners,
            UserGroup::Customers => &self.customers,
            UserGroup::Cancelled => &self.cancelled,
            UserGroup::All | UserGroup::NonStaff => return None,
        };
        prefix.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether `department` belongs to `group`. Unconfigured groups match nothing.
    pub fn matches(&self, group: UserGroup, department: &Department) -> bool {
        self.prefix(group)
            .is_some_and(|prefix| department.name.starts_with(prefix))
    }
}

const CLASSIFIED_GROUPS: [UserGroup; 6] = [
    UserGroup::Staff,
    UserGroup::Visitors,
    UserGroup::Contractors,
    UserGroup::Cleaners,
    UserGroup::Customers,
    UserGroup::Cancelled,
];

impl Site {
    // ── Users ────────────────────────────────────────────────────────

    pub fn user(&self, user_id: i64) -> Option<Arc<User>> {
        self.cache.users.get(user_id)
    }

    /// All cached users, ordered by ID.
    pub fn users(&self) -> Vec<Arc<User>> {
        self.cache.users.snapshot().to_vec()
    }

    /// Users in `group` passing the `activity` filter, ordered by ID.
    pub fn users_in(&self, group: UserGroup, activity: Activity) -> Vec<Arc<User>> {
        let now = self.clock.now();
        let prefixes = &self.config.department_prefixes;

        self.cache
            .users
            .snapshot()
            .iter()
            .filter(|user| match group {
                UserGroup::All => true,
                UserGroup::NonStaff => {
                    user.is_active(now)
                        && user
                            .departments
                            .iter()
                            .any(|d| !prefixes.matches(UserGroup::Staff, d))
                }
                _ => user.departments.iter().any(|d| prefixes.matches(group, d)),
            })
            .filter(|user| match activity {
                Activity::Any => true,
                Activity::Active => user.is_active(now),
                Activity::ActiveToday => user.accessed_today(now),
            })
            .cloned()
            .collect()
    }

    /// The group of the user's first department matching a configured prefix.
    pub fn classify(&self, user: &User) -> Option<UserGroup> {
        let prefixes = &self.config.department_prefixes;
        user.departments.iter().find_map(|department| {
            CLASSIFIED_GROUPS
                .into_iter()
                .find(|group| prefixes.matches(*group, department))
        })
    }

    pub fn staff(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Staff, Activity::Any)
    }

    pub fn active_staff(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Staff, Activity::Active)
    }

    pub fn active_staff_today(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Staff, Activity::ActiveToday)
    }

    pub fn visitors(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Visitors, Activity::Any)
    }

    pub fn active_visitors(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Visitors, Activity::Active)
    }

    pub fn active_visitors_today(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Visitors, Activity::ActiveToday)
    }

    pub fn contractors(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Contractors, Activity::Any)
    }

    pub fn active_contractors(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Contractors, Activity::Active)
    }

    pub fn active_contractors_today(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Contractors, Activity::ActiveToday)
    }

    pub fn cleaners(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Cleaners, Activity::Any)
    }

    pub fn active_cleaners(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Cleaners, Activity::Active)
    }

    pub fn active_cleaners_today(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Cleaners, Activity::ActiveToday)
    }

    pub fn customers(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Customers, Activity::Any)
    }

    pub fn active_customers(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Customers, Activity::Active)
    }

    pub fn active_customers_today(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Customers, Activity::ActiveToday)
    }

    pub fn cancelled_users(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::Cancelled, Activity::Any)
    }

    pub fn active_users(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::All, Activity::Active)
    }

    pub fn active_users_today(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::All, Activity::ActiveToday)
    }

    pub fn active_non_staff(&self) -> Vec<Arc<User>> {
        self.users_in(UserGroup::NonStaff, Activity::Active)
    }

    // ── Doors ────────────────────────────────────────────────────────

    pub fn doors(&self) -> Vec<Arc<Door>> {
        self.cache.doors.snapshot().to_vec()
    }

    pub fn door(&self, door_id: i64) -> Option<Arc<Door>> {
        self.cache.doors.get(door_id)
    }

    /// Cached doors listed in the monitoring config, in config order, named
    /// as configured. Monitored doors the server doesn't report are skipped.
    pub fn monitored_doors(&self) -> Vec<Door> {
        self.config
            .monitored_doors
            .iter()
            .filter_map(|monitored| {
                let door = self.cache.doors.get(monitored.id)?;
                Some(Door {
                    name: monitored.name.clone(),
                    zone: Some(monitored.zone.clone()),
                    ..(*door).clone()
                })
            })
            .collect()
    }

    pub fn openable_doors(&self) -> &[OpenableDoor] {
        &self.config.openable_doors
    }

    pub fn openable_door(&self, name: &str) -> Result<&OpenableDoor, CoreError> {
        self.config
            .openable_doors
            .iter()
            .find(|door| door.name == name)
            .ok_or_else(|| CoreError::OpenableDoorNotFound {
                site: self.id(),
                name: name.to_owned(),
            })
    }

    // ── Reference data ───────────────────────────────────────────────

    pub fn access_levels(&self) -> Vec<Arc<AccessLevel>> {
        self.cache.access_levels.snapshot().to_vec()
    }

    pub fn departments(&self) -> Vec<Arc<Department>> {
        self.cache.departments.snapshot().to_vec()
    }

    pub fn unknown_tokens(&self) -> Arc<Vec<UnknownTokenEvent>> {
        self.cache.unknown_tokens()
    }

    pub fn record_unknown_token(&self, event: UnknownTokenEvent) {
        debug!(parent: &self.span, token = event.token, location = %event.location, "unknown token");
        self.cache.push_unknown_token(event);
    }

    // ── Pictures ─────────────────────────────────────────────────────

    /// The user's photo, or a "photo needed" placeholder if none is on file.
    pub async fn user_picture(&self, user_id: i64) -> Result<Bytes, CoreError> {
        let image = self.client.user_image(user_id).await?;
        Ok(image.unwrap_or_else(|| Bytes::from_static(PHOTO_NEEDED)))
    }

    /// Photo of the single cached user carrying `local_id`.
    pub async fn user_picture_by_local_id(&self, local_id: &str) -> Result<Bytes, CoreError> {
        let users = self.cache.users.snapshot();
        let mut matching = users
            .iter()
            .filter(|user| user.local_id.as_deref() == Some(local_id));

        match (matching.next(), matching.next()) {
            (Some(user), None) => self.user_picture(user.id).await,
            _ => Err(CoreError::UserNotFound {
                site: self.id(),
                user: local_id.to_owned(),
            }),
        }
    }

    /// A transparent 1x1 GIF.
    pub fn blank_picture(&self) -> Bytes {
        Bytes::from_static(BLANK_GIF)
    }
}

/// The embedded "photo needed" placeholder.
pub fn photo_needed() -> Bytes {
    Bytes::from_static(PHOTO_NEEDED)
}
