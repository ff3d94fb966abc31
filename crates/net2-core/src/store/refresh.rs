// ── Refresh application logic ──
//
// Applies freshly fetched collections to a `SiteCache`. Doors, departments
// and access levels mirror the server exactly; users are only ever upserted.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use super::SiteCache;
use super::collection::EntityCollection;
use crate::model::{AccessLevel, Department, Door, User};

/// Upsert all incoming entities, then prune any existing IDs not in the
/// incoming set. This avoids the brief empty state that a clear causes.
fn upsert_and_prune<T: Clone + Send + Sync + 'static>(
    collection: &EntityCollection<T>,
    items: Vec<(i64, T)>,
) {
    let incoming: HashSet<i64> = items.iter().map(|(id, _)| *id).collect();
    collection.upsert_many(items);
    for existing in collection.ids() {
        if !incoming.contains(&existing) {
            collection.remove(existing);
        }
    }
}

impl SiteCache {
    pub(crate) fn apply_doors(&self, doors: Vec<Door>) {
        upsert_and_prune(&self.doors, doors.into_iter().map(|d| (d.id, d)).collect());
    }

    pub(crate) fn apply_departments(&self, departments: Vec<Department>) {
        upsert_and_prune(
            &self.departments,
            departments.into_iter().map(|d| (d.id, d)).collect(),
        );
    }

    pub(crate) fn apply_access_levels(&self, levels: Vec<AccessLevel>) {
        upsert_and_prune(
            &self.access_levels,
            levels.into_iter().map(|l| (l.id, l)).collect(),
        );
    }

    /// Overwrite each fetched user. Users missing from the fetch are kept.
    pub(crate) fn apply_users(&self, users: Vec<User>) {
        self.users
            .upsert_many(users.into_iter().map(|u| (u.id, u)));
    }

    pub(crate) fn mark_refreshed(&self, at: NaiveDateTime) {
        self.last_successful_refresh.send_replace(Some(at));
    }
}
