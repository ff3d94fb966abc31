// ── Door domain types ──

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raw controller status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoorStatus(pub i64);

impl DoorStatus {
    pub const INTRUDER_ALARM: i64 = 0x01;
    pub const PSU_OK: i64 = 0x02;
    pub const TAMPER_GOOD: i64 = 0x04;
    pub const CONTACT_CLOSED: i64 = 0x08;
    pub const ALARM_TRIPPED: i64 = 0x10;
    pub const DOOR_OPEN: i64 = 0x20;

    fn has(self, flag: i64) -> bool {
        self.0 & flag != 0
    }

    pub fn intruder_alarm(self) -> bool {
        self.has(Self::INTRUDER_ALARM)
    }

    pub fn psu_ok(self) -> bool {
        self.has(Self::PSU_OK)
    }

    pub fn tamper_good(self) -> bool {
        self.has(Self::TAMPER_GOOD)
    }

    pub fn contact_closed(self) -> bool {
        self.has(Self::CONTACT_CLOSED)
    }

    pub fn alarm_tripped(self) -> bool {
        self.has(Self::ALARM_TRIPPED)
    }

    pub fn is_open(self) -> bool {
        self.has(Self::DOOR_OPEN)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    pub id: i64,
    pub name: String,
    pub status: DoorStatus,
    /// Intruder alarm bit of `status`.
    pub alarm: bool,
    /// Monitoring zone from configuration, if the door is monitored.
    pub zone: Option<String>,
}

/// One step of a door sequence: open `door`, then wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorSequenceItem {
    pub door: i64,
    pub wait: Duration,
}

impl DoorSequenceItem {
    pub fn new(door: i64, wait: Duration) -> Self {
        Self { door, wait }
    }
}
