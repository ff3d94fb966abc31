// ── Per-site cache ──
//
// In-memory mirror of one Net2 server. Readers take snapshots; only the
// owning `Site` writes, under its refresh lock.

mod collection;
mod refresh;

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::watch;

pub(crate) use collection::EntityCollection;

use crate::model::{AccessLevel, Department, Door, UnknownTokenEvent, User};

pub(crate) struct SiteCache {
    pub(crate) users: EntityCollection<User>,
    pub(crate) doors: EntityCollection<Door>,
    pub(crate) departments: EntityCollection<Department>,
    pub(crate) access_levels: EntityCollection<AccessLevel>,
    last_successful_refresh: watch::Sender<Option<NaiveDateTime>>,
    unknown_tokens: watch::Sender<Arc<Vec<UnknownTokenEvent>>>,
}

impl SiteCache {
    pub(crate) fn new() -> Self {
        let (last_successful_refresh, _) = watch::channel(None);
        let (unknown_tokens, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            users: EntityCollection::new(),
            doors: EntityCollection::new(),
            departments: EntityCollection::new(),
            access_levels: EntityCollection::new(),
            last_successful_refresh,
            unknown_tokens,
        }
    }

    pub(crate) fn last_successful_refresh(&self) -> Option<NaiveDateTime> {
        *self.last_successful_refresh.borrow()
    }

    pub(crate) fn subscribe_refresh(&self) -> watch::Receiver<Option<NaiveDateTime>> {
        self.last_successful_refresh.subscribe()
    }

    pub(crate) fn unknown_tokens(&self) -> Arc<Vec<UnknownTokenEvent>> {
        self.unknown_tokens.borrow().clone()
    }

    pub(crate) fn push_unknown_token(&self, event: UnknownTokenEvent) {
        self.unknown_tokens.send_modify(|events| {
            Arc::make_mut(events).push(event);
        });
    }

    /// Resolve an access level name back to its ID.
    pub(crate) fn access_level_id(&self, name: &str) -> Option<i64> {
        self.access_levels
            .snapshot()
            .iter()
            .find(|level| level.name == name)
            .map(|level| level.id)
    }
}
