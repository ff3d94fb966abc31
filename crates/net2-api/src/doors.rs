// Door endpoints and door commands

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;

use crate::client::Net2Client;
use crate::error::Error;
use crate::models::{DeviceStatusRow, DoorRecord, Relay};

const DEVICE_STATUS_QUERY: &str = "SELECT Address, StatusFlag FROM devices";

/// How long a timed relay open holds the door, in milliseconds.
pub const RELAY_OPEN_TIME_MS: u32 = 1000;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RelayFunction {
    relay_id: Relay,
    relay_action: &'static str,
    relay_open_time: u32,
}

#[derive(Serialize)]
struct DoorControl {
    #[serde(rename = "doorId")]
    door_id: i64,
    #[serde(rename = "RelayFunction")]
    relay_function: RelayFunction,
}

impl Net2Client {
    /// List doors.
    ///
    /// `GET /api/v1/doors`
    pub async fn list_doors(&self) -> Result<Vec<DoorRecord>, Error> {
        self.get_json("api/v1/doors", &[]).await
    }

    /// Raw status flags for every controller, keyed by address.
    pub async fn device_status(&self) -> Result<Vec<DeviceStatusRow>, Error> {
        self.custom_query(DEVICE_STATUS_QUERY).await
    }

    /// Open a door.
    ///
    /// `POST /api/v1/commands/door/open`
    pub async fn open_door(&self, door_id: i64) -> Result<(), Error> {
        self.send_command(
            Method::POST,
            "api/v1/commands/door/open",
            &json!({ "doorId": door_id }),
            &[StatusCode::OK],
        )
        .await
    }

    /// Close a door.
    ///
    /// `POST /api/v1/commands/door/close`
    pub async fn close_door(&self, door_id: i64) -> Result<(), Error> {
        self.send_command(
            Method::POST,
            "api/v1/commands/door/close",
            &json!({ "doorId": door_id }),
            &[StatusCode::OK],
        )
        .await
    }

    /// Pulse one relay of a door controller open for a fixed time.
    ///
    /// `POST /api/v1/commands/door/control`
    pub async fn control_door(&self, door_id: i64, relay: Relay) -> Result<(), Error> {
        let body = DoorControl {
            door_id,
            relay_function: RelayFunction {
                relay_id: relay,
                relay_action: "TimedOpen",
                relay_open_time: RELAY_OPEN_TIME_MS,
            },
        };
        self.send_command(
            Method::POST,
            "api/v1/commands/door/control",
            &body,
            &[StatusCode::OK],
        )
        .await
    }
}
