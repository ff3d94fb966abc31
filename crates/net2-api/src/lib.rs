// net2-api: Async Rust client for the Net2 access-control REST API

pub mod access;
pub mod auth;
pub mod client;
pub mod doors;
pub mod error;
pub mod models;
pub mod transport;
pub mod users;

pub use auth::Credentials;
pub use client::Net2Client;
pub use error::Error;
pub use models::{
    AccessLevelRecord, AreaPermission, AreaRecord, CustomFieldDefinition, DepartmentRecord,
    DeviceStatusRow, DoorRecord, PermissionSet, Relay, UserRow, UserUpdate,
};
pub use transport::{TlsMode, TransportConfig};
