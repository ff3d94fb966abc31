//! Site synchronization and caching layer between `net2-api` and consumers.
//!
//! This crate mirrors one or more Net2 access-control servers into memory
//! and relays commands back to them:
//!
//! - **[`Site`]**: one server. Owns the API client, the in-memory cache of
//!   users, doors, departments and access levels, and a background refresh
//!   schedule. All refreshes and command write-throughs for a site are
//!   serialized by a per-site lock; reads are lock-free snapshots.
//!
//! - **[`SiteManager`]**: registry of sites with a start/stop lifecycle and
//!   a concurrent [`update_all`](SiteManager::update_all) whose per-site
//!   failures stay isolated.
//!
//! - **Domain model** ([`model`]): canonical `User`, `Door`, `Department`
//!   and `AccessLevel` types. Individually grantable areas are folded into
//!   the access level table above [`AREA_ID_OFFSET`].
//!
//! - **[`Clock`]**: local wall-clock source used for activity windows and
//!   expiry dates, swappable for a [`FixedClock`] in tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod site;

mod convert;
mod scheduler;
mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    DEFAULT_REFRESH_INTERVAL, DepartmentPrefixes, MonitoredDoor, OpenableDoor, SiteConfig,
    SiteCredentials, TlsVerification,
};
pub use error::CoreError;
pub use manager::{ManagerState, SiteManager};
pub use site::{Activity, ExpiryChange, RefreshReport, Site, Subsystem, UserGroup, photo_needed};

pub use model::{
    AREA_ID_OFFSET, AccessLevel, Department, Door, DoorSequenceItem, DoorStatus,
    UnknownTokenEvent, User,
};

// Wire-level types that appear in this crate's API.
pub use net2_api::Relay;
