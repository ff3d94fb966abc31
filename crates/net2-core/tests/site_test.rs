#![allow(clippy::unwrap_used)]
// Integration tests for `Site` refresh and read views using wiremock.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use net2_core::{
    Activity, Clock, DoorSequenceItem, MonitoredDoor, OpenableDoor, Site, Subsystem,
    UnknownTokenEvent, UserGroup, photo_needed,
};

fn ids(users: &[Arc<net2_core::User>]) -> Vec<i64> {
    users.iter().map(|u| u.id).collect()
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_all_populates_cache() {
    let (_server, site) = ready_site(1).await;

    let levels: Vec<(i64, String)> = site
        .access_levels()
        .iter()
        .map(|l| (l.id, l.name.clone()))
        .collect();
    assert_eq!(
        levels,
        [
            (1, "Working hours".to_string()),
            (2, "Anytime".to_string()),
            (10_001, "Idv: Server room".to_string()),
        ]
    );

    let front = site.door(101).unwrap();
    assert!(front.alarm);
    assert!(front.status.psu_ok());
    assert!(!site.door(102).unwrap().alarm);

    assert_eq!(site.departments().len(), 3);
    assert_eq!(ids(&site.users()), [7, 8, 9]);

    let ada = site.user(7).unwrap();
    assert_eq!(ada.full_name(), "Ada Tester");
    assert_eq!(ada.departments[0].name, "Staff-Eng");
    assert_eq!(ada.access_levels, ["Working hours"]);
    assert!(site.user(9).unwrap().expiry.is_none());

    assert!(site.last_successful_refresh().is_some());
    assert!(site.is_up_to_date(Duration::from_secs(180)));
}

/// A clock the test moves forward by hand.
#[derive(Debug)]
struct ManualClock(Mutex<NaiveDateTime>);

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

#[tokio::test]
async fn test_freshness_follows_site_clock() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let clock = Arc::new(ManualClock(Mutex::new(now())));
    let site = Site::with_clock(site_config(1, &server), clock.clone()).unwrap();

    let report = site.refresh_all().await;
    assert_eq!(report.completed_at, Some(now()));
    assert_eq!(site.last_successful_refresh(), Some(now()));
    assert!(site.is_up_to_date(Duration::from_secs(180)));

    *clock.0.lock().unwrap() = now() + chrono::Duration::minutes(4);
    assert!(!site.is_up_to_date(Duration::from_secs(180)));
    assert!(site.is_up_to_date(Duration::from_secs(300)));
}

#[tokio::test]
async fn test_failed_subsystem_keeps_previous_data_and_timestamp() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_departments(&server).await;
    mount_users(&server, default_users()).await;

    // Doors succeed once, then the controller goes away.
    Mock::given(method("GET"))
        .and(path("/api/v1/doors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 101, "name": "Front door" }
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/doors"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_query(&server, DEVICE_STATUS_SQL, json!([])).await;

    let site = build_site(site_config(1, &server));
    let first = site.refresh_all().await;
    assert!(first.is_complete());
    let refreshed_at = site.last_successful_refresh().unwrap();

    let second = site.refresh_all().await;
    assert_eq!(second.failed, [Subsystem::Doors]);
    assert_eq!(second.completed_at, None);
    assert_eq!(site.last_successful_refresh(), Some(refreshed_at));
    assert_eq!(site.doors().len(), 1);
    // The other subsystems still ran.
    assert_eq!(site.users().len(), 3);
}

#[tokio::test]
async fn test_users_are_upserted_never_removed() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_doors(&server).await;
    mount_departments(&server).await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(wiremock::matchers::query_param("query", ACTIVE_USERS_SQL))
        .respond_with(ResponseTemplate::new(200).set_body_json(default_users()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_users(
        &server,
        json!([user_row(7, "Ada", (10, "Staff-Eng"), "2027-01-01T00:00:00")]),
    )
    .await;

    let site = build_site(site_config(1, &server));
    site.refresh_all().await;
    site.refresh_all().await;

    assert_eq!(ids(&site.users()), [7, 8, 9]);
}

#[tokio::test]
async fn test_concurrent_refreshes_are_serialized() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_departments(&server).await;
    mount_users(&server, default_users()).await;
    mount_query(&server, DEVICE_STATUS_SQL, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/doors"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 101, "name": "Front door" }]))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let site = build_site(site_config(1, &server));
    let (a, b) = tokio::join!(site.refresh_all(), site.refresh_all());
    assert!(a.is_complete() && b.is_complete());

    let log = request_log(&server).await;
    let cycle_ends: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, entry)| *entry == ACTIVE_USERS_SQL)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(cycle_ends.len(), 2);
    // Nothing from the second cycle arrives before the first one ends.
    assert_eq!(cycle_ends[0], log.len() / 2 - 1);
}

#[tokio::test]
async fn test_permission_set_resolves_individual_levels() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_doors(&server).await;
    mount_departments(&server).await;
    mount_users(
        &server,
        json!([{
            "userID": 12,
            "FirstName": "Dee",
            "Surname": "Individual",
            "AccessLevelName": "Individual: Dee Individual"
        }]),
    )
    .await;
    mount_get(
        &server,
        "/api/v1/users/12/doorpermissionset",
        json!({
            "accessLevels": [2, 77],
            "individualPermissions": [{ "areaId": 1 }]
        }),
    )
    .await;

    let site = build_site(site_config(1, &server));
    assert!(site.refresh_all().await.is_complete());

    assert_eq!(
        site.user(12).unwrap().access_levels,
        ["Anytime", "Idv: Server room"]
    );
}

#[tokio::test]
async fn test_local_id_column_is_resolved_from_custom_fields() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_doors(&server).await;
    mount_departments(&server).await;
    mount_get(
        &server,
        "/api/v1/users/customfieldnames",
        json!([
            { "id": 3, "name": "Car reg" },
            { "id": 7, "name": "Payroll" }
        ]),
    )
    .await;
    mount_query(
        &server,
        "SELECT *, Field7_60 as LocalID FROM UsersEx WHERE Active=1",
        json!([{ "userID": 7, "FirstName": "Ada", "LocalID": 4417 }]),
    )
    .await;

    let mut config = site_config(1, &server);
    config.local_id_field = "Payroll".into();
    let site = build_site(config);
    assert!(site.refresh_all().await.is_complete());

    assert_eq!(site.user(7).unwrap().local_id.as_deref(), Some("4417"));
}

// ── Views ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_department_prefix_views() {
    let (_server, site) = ready_site(1).await;

    assert_eq!(ids(&site.staff()), [7]);
    assert_eq!(ids(&site.visitors()), [8]);
    assert!(site.active_visitors().is_empty());
    assert_eq!(ids(&site.cancelled_users()), [9]);
    // Cleaners have no prefix configured.
    assert!(site.cleaners().is_empty());
    assert_eq!(ids(&site.active_users()), [7, 9]);
    assert_eq!(ids(&site.active_staff_today()), [7]);
    assert_eq!(ids(&site.active_non_staff()), [9]);
    assert_eq!(
        ids(&site.users_in(UserGroup::All, Activity::Any)),
        [7, 8, 9]
    );

    let ada = site.user(7).unwrap();
    assert_eq!(site.classify(&ada), Some(UserGroup::Staff));
}

#[tokio::test]
async fn test_non_staff_without_staff_prefix_is_every_active_user() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let mut config = site_config(1, &server);
    config.department_prefixes.staff = None;
    let site = build_site(config);
    site.refresh_all().await;

    assert!(site.staff().is_empty());
    assert_eq!(ids(&site.active_non_staff()), [7, 9]);
    assert_eq!(
        ids(&site.users_in(UserGroup::NonStaff, Activity::Any)),
        [7, 9]
    );
}

#[tokio::test]
async fn test_monitored_doors_follow_config() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let mut config = site_config(1, &server);
    config.monitored_doors = vec![
        MonitoredDoor {
            id: 102,
            name: "Loading bay".into(),
            zone: "Yard".into(),
        },
        MonitoredDoor {
            id: 999,
            name: "Gone".into(),
            zone: "Yard".into(),
        },
        MonitoredDoor {
            id: 101,
            name: "Reception".into(),
            zone: "Lobby".into(),
        },
    ];
    let site = build_site(config);
    site.refresh_all().await;

    let monitored: Vec<(i64, String)> = site
        .monitored_doors()
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    assert_eq!(
        monitored,
        [(102, "Loading bay".to_string()), (101, "Reception".to_string())]
    );
    assert_eq!(site.door(102).unwrap().zone.as_deref(), Some("Yard"));
}

#[tokio::test]
async fn test_reference_data_refreshes_on_its_own() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_departments(&server).await;
    let site = build_site(site_config(1, &server));

    site.refresh_access_levels().await.unwrap();
    site.refresh_departments().await.unwrap();

    assert_eq!(site.access_levels().len(), 3);
    assert_eq!(site.departments().len(), 3);
    assert!(site.users().is_empty());
    assert!(site.doors().is_empty());
}

#[tokio::test]
async fn test_openable_doors_follow_config() {
    let server = MockServer::start().await;
    let mut config = site_config(1, &server);
    config.openable_doors = vec![OpenableDoor {
        name: "Airlock".into(),
        sequence: vec![DoorSequenceItem::new(101, Duration::ZERO)],
    }];
    let site = build_site(config);

    let names: Vec<&str> = site.openable_doors().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Airlock"]);
    assert!(site.openable_door("Vault").unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_unknown_tokens_are_recorded_in_order() {
    let server = MockServer::start().await;
    let site = build_site(site_config(1, &server));
    assert!(site.unknown_tokens().is_empty());

    for (token, location) in [(4411, "Front door"), (4412, "Goods in")] {
        site.record_unknown_token(UnknownTokenEvent {
            date: now(),
            location: location.into(),
            token,
        });
    }

    let tokens: Vec<i64> = site.unknown_tokens().iter().map(|e| e.token).collect();
    assert_eq!(tokens, [4411, 4412]);
}

// ── Pictures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_photo_returns_placeholder() {
    let (server, site) = ready_site(1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/7/image"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/8/image"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEGDATA".to_vec()))
        .mount(&server)
        .await;

    assert_eq!(site.user_picture(7).await.unwrap(), photo_needed());
    assert_eq!(&site.user_picture(8).await.unwrap()[..], b"JPEGDATA");
    assert!(site.user_picture_by_local_id("nobody").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_blank_picture_is_a_gif() {
    let server = MockServer::start().await;
    let site = build_site(site_config(1, &server));
    assert!(site.blank_picture().starts_with(b"GIF89a"));
}
