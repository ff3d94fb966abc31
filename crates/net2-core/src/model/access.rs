// ── Access level and department domain types ──

use serde::{Deserialize, Serialize};

/// Offset added to area IDs so they never collide with named access levels.
pub const AREA_ID_OFFSET: i64 = 10_000;

/// Display prefix for individually granted areas.
pub const AREA_NAME_PREFIX: &str = "Idv: ";

/// An access level: either a shared named level or an individually
/// grantable area remapped above [`AREA_ID_OFFSET`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLevel {
    pub id: i64,
    pub name: String,
}

impl AccessLevel {
    /// Build the entry for a remote area.
    pub fn from_area(area_id: i64, area_name: &str) -> Self {
        Self {
            id: AREA_ID_OFFSET + area_id,
            name: format!("{AREA_NAME_PREFIX}{area_name}"),
        }
    }

    /// The remote area ID, if this entry is an area.
    pub fn area_id(&self) -> Option<i64> {
        (self.id >= AREA_ID_OFFSET).then(|| self.id - AREA_ID_OFFSET)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}
