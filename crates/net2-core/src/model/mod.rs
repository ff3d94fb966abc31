// ── Domain model ──
//
// Canonical representation of the entities mirrored from a Net2 server.
// Wire types live in net2-api; `crate::convert` maps them into these.

pub mod access;
pub mod door;
pub mod event;
pub mod user;

// ── Re-exports ──────────────────────────────────────────────────────

pub use access::{AREA_ID_OFFSET, AccessLevel, Department};
pub use door::{Door, DoorSequenceItem, DoorStatus};
pub use event::UnknownTokenEvent;
pub use user::User;
