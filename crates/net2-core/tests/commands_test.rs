#![allow(clippy::unwrap_used)]
// Integration tests for door and user commands using wiremock.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::*;
use net2_core::{CoreError, DoorSequenceItem, ExpiryChange, OpenableDoor, Relay};

const OPEN_PATH: &str = "/api/v1/commands/door/open";

async fn bodies(server: &wiremock::MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ── Doors ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_door_never_reaches_server() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("POST"))
        .and(path(OPEN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/commands/door/close"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = site.open_door(555).await.unwrap_err();
    assert!(matches!(err, CoreError::DoorNotFound { site: 1, door: 555 }));
    assert!(site.close_door(555).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_door_failure_is_reported_generically() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("POST"))
        .and(path(OPEN_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("controller offline"))
        .mount(&server)
        .await;

    let err = site.open_door(101).await.unwrap_err();
    assert_eq!(err.to_string(), "Unable to open door 101");
}

#[tokio::test]
async fn test_relay_open_sends_timed_open() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/commands/door/control"))
        .and(body_json(json!({
            "doorId": 102,
            "RelayFunction": {
                "RelayId": "Relay2",
                "RelayAction": "TimedOpen",
                "RelayOpenTime": 1000
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    site.open_door_with_relay(102, Relay::Relay2).await.unwrap();
}

#[tokio::test]
async fn test_sequence_runs_in_order_and_survives_failures() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("POST"))
        .and(path(OPEN_PATH))
        .and(body_json(json!({ "doorId": 101 })))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(OPEN_PATH))
        .and(body_json(json!({ "doorId": 102 })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let handle = site.spawn_sequence(vec![
        DoorSequenceItem::new(101, Duration::from_millis(20)),
        DoorSequenceItem::new(102, Duration::from_millis(20)),
        DoorSequenceItem::new(555, Duration::ZERO),
        DoorSequenceItem::new(102, Duration::ZERO),
    ]);
    handle.await.unwrap();

    let opened: Vec<i64> = bodies(&server, OPEN_PATH)
        .await
        .iter()
        .map(|b| b["doorId"].as_i64().unwrap())
        .collect();
    assert_eq!(opened, [101, 102, 102]);
}

#[tokio::test]
async fn test_openable_sequence_by_name() {
    let server = wiremock::MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("POST"))
        .and(path(OPEN_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = site_config(1, &server);
    config.openable_doors = vec![OpenableDoor {
        name: "Airlock".into(),
        sequence: vec![
            DoorSequenceItem::new(101, Duration::from_millis(10)),
            DoorSequenceItem::new(102, Duration::ZERO),
        ],
    }];
    let site = build_site(config);
    site.refresh_all().await;

    site.run_openable_sequence("Airlock").unwrap().await.unwrap();
    assert!(matches!(
        site.run_openable_sequence("Lobby").unwrap_err(),
        CoreError::OpenableDoorNotFound { .. }
    ));
}

// ── Users ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_activate_sets_tomorrow_end_of_day() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/8"))
        .and(body_json(json!({
            "Id": 8,
            "ExpiryDate": "2026-03-11T23:59:59"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    site.activate_user(8).await.unwrap();

    let bo = site.user(8).unwrap();
    assert_eq!(
        bo.expiry.unwrap().format("%Y-%m-%dT%H:%M:%S").to_string(),
        "2026-03-11T23:59:59"
    );
    assert!(bo.is_active(now()));
}

#[tokio::test]
async fn test_deactivate_sets_yesterday_and_rereads_user() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7"))
        .and(body_json(json!({
            "Id": 7,
            "ExpiryDate": "2026-03-09T23:59:59"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("query", "SELECT * FROM UsersEx WHERE userID=7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_row(
            7,
            "Ada",
            (10, "Staff-Eng"),
            "2026-03-09T23:59:59"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    site.deactivate_user(7).await.unwrap();

    assert!(!site.user(7).unwrap().is_active(now()));
    assert!(site.active_staff().is_empty());
}

#[tokio::test]
async fn test_failed_update_leaves_cache_untouched() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = site
        .update_user_info(7, Some("Eve".into()), None, ExpiryChange::Keep)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UserUpdate { user: 7 }));
    assert_eq!(site.user(7).unwrap().first_name, "Ada");
}

#[tokio::test]
async fn test_unknown_user_or_department_is_rejected() {
    let (_server, site) = ready_site(1).await;

    assert!(site.activate_user(404).await.unwrap_err().is_not_found());
    assert!(matches!(
        site.change_department(7, 999).await.unwrap_err(),
        CoreError::DepartmentNotFound { department: 999, .. }
    ));
}

#[tokio::test]
async fn test_change_department_writes_through() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7/departments"))
        .and(body_json(json!({ "Id": 20, "Name": "Visitor" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    site.change_department(7, 20).await.unwrap();
    assert_eq!(site.user(7).unwrap().departments[0].name, "Visitor");
}

#[tokio::test]
async fn test_set_access_level_replaces_all_levels() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7/doorpermissionset"))
        .and(body_json(json!({ "accessLevels": [2], "individualPermissions": [] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    site.set_access_level(7, 2).await.unwrap();
    assert_eq!(site.user(7).unwrap().access_levels, ["Anytime"]);
}

#[tokio::test]
async fn test_add_and_remove_access_levels() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7/doorpermissionset"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    site.add_access_level(7, 10_001).await.unwrap();
    assert_eq!(
        site.user(7).unwrap().access_levels,
        ["Working hours", "Idv: Server room"]
    );

    site.remove_access_level(7, 1).await.unwrap();
    assert_eq!(site.user(7).unwrap().access_levels, ["Idv: Server room"]);

    let sent = bodies(&server, "/api/v1/users/7/doorpermissionset").await;
    assert_eq!(
        sent,
        [
            json!({ "accessLevels": [1], "individualPermissions": [{ "areaId": 1 }] }),
            json!({ "accessLevels": [], "individualPermissions": [{ "areaId": 1 }] }),
        ]
    );
}

#[tokio::test]
async fn test_combined_update_without_level_removes_access() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7"))
        .and(body_json(json!({
            "Id": 7,
            "FirstName": "Ada",
            "LastName": "Lovelace",
            "ExpiryDate": null
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/users/7/doorpermissionset"))
        .and(body_json(json!({ "accessLevels": [0], "individualPermissions": [] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    site.update_user_name_and_expiry_and_access_level(
        7,
        "Ada".into(),
        "Lovelace".into(),
        None,
        None,
    )
    .await
    .unwrap();

    let ada = site.user(7).unwrap();
    assert_eq!(ada.surname, "Lovelace");
    assert_eq!(ada.expiry, None);
}

#[tokio::test]
async fn test_reset_anti_passback() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/commands/antipassback/reset"))
        .and(body_json(json!({ "userId": 9 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("query", "SELECT * FROM UsersEx WHERE userID=9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_row(
            9,
            "Cy",
            (30, "Cancelled"),
            "0001-01-01T00:00:00"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    site.reset_anti_passback(9).await.unwrap();
}

#[tokio::test]
async fn test_failed_anti_passback_reset_skips_reread() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/commands/antipassback/reset"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("query", "SELECT * FROM UsersEx WHERE userID=9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    assert!(matches!(
        site.reset_anti_passback(9).await.unwrap_err(),
        CoreError::UserUpdate { user: 9 }
    ));
}
