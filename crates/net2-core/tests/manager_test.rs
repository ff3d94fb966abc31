#![allow(clippy::unwrap_used)]
// Integration tests for `SiteManager` lifecycle and fan-out refresh.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use net2_core::{CoreError, ManagerState, SiteManager, Subsystem};

/// A site whose door endpoint answers once, then always fails.
async fn broken_doors_server() -> MockServer {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_access_levels(&server).await;
    mount_departments(&server).await;
    mount_users(&server, default_users()).await;
    mount_query(&server, DEVICE_STATUS_SQL, json!([])).await;
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
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_reads_are_empty_until_started() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let manager = SiteManager::new([build_site(site_config(1, &server))]);

    assert_eq!(manager.state(), ManagerState::NotStarted);
    assert!(manager.site(1).is_none());
    assert!(manager.sites().is_empty());
    assert_eq!(manager.count(), 0);
    assert!(manager.update_all().await.is_empty());
    assert!(manager.trigger_update_all().is_none());
    assert!(matches!(
        manager.require_site(1).unwrap_err(),
        CoreError::NotStarted
    ));

    let mut state = manager.subscribe_state();
    manager.start().await.unwrap();
    assert!(state.has_changed().unwrap());
    assert_eq!(*state.borrow_and_update(), ManagerState::Started);
    assert_eq!(manager.state(), ManagerState::Started);
    assert_eq!(manager.count(), 1);
    assert!(manager.site(1).is_some());
    assert!(manager.require_site(2).unwrap_err().is_not_found());

    manager.stop().await;
    assert_eq!(manager.state(), ManagerState::Stopped);
    assert!(manager.site(1).is_none());
}

#[tokio::test]
async fn test_update_all_isolates_site_failures() {
    let healthy = MockServer::start().await;
    mount_site(&healthy).await;
    let broken = broken_doors_server().await;

    // One good cycle before the door endpoint goes away.
    let seeded = build_site(site_config(2, &broken));
    assert!(seeded.refresh_all().await.is_complete());
    let seeded_at = seeded.last_successful_refresh();

    let manager = SiteManager::new([seeded, build_site(site_config(1, &healthy))]);
    manager.start().await.unwrap();

    let reports = manager.update_all().await;
    let summary: Vec<(i64, Vec<Subsystem>)> = reports
        .iter()
        .map(|(id, report)| (*id, report.failed.clone()))
        .collect();
    assert_eq!(summary, [(1, vec![]), (2, vec![Subsystem::Doors])]);

    let good = manager.site(1).unwrap();
    let bad = manager.site(2).unwrap();
    assert!(good.last_successful_refresh().is_some());
    assert_eq!(good.doors().len(), 2);
    assert_eq!(bad.last_successful_refresh(), seeded_at);
    let doors: Vec<(i64, String)> = bad.doors().iter().map(|d| (d.id, d.name.clone())).collect();
    assert_eq!(doors, [(101, "Front door".to_string())]);
    assert_eq!(bad.users().len(), 3);

    manager.stop().await;
}

#[tokio::test]
async fn test_trigger_update_all_returns_joinable_handle() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let manager = SiteManager::new([build_site(site_config(1, &server))]);
    manager.start().await.unwrap();

    let reports = manager.trigger_update_all().unwrap().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1.is_complete());

    manager.stop().await;
}

#[tokio::test]
async fn test_start_twice_is_a_no_op() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let manager = SiteManager::new([build_site(site_config(1, &server))]);

    manager.start().await.unwrap();
    manager.start().await.unwrap();
    assert_eq!(manager.count(), 1);
    manager.stop().await;
}

#[tokio::test]
async fn test_scheduler_refreshes_on_start() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let site = build_site(site_config(1, &server));
    let mut refreshed = site.subscribe_refresh();

    site.start().await.unwrap();
    assert!(matches!(
        site.start().await.unwrap_err(),
        CoreError::AlreadyStarted { site: 1 }
    ));

    refreshed.changed().await.unwrap();
    assert!(refreshed.borrow().is_some());

    site.stop().await;
    assert!(!site.is_started().await);
}

#[tokio::test]
async fn test_scheduler_keeps_ticking_until_stopped() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let mut config = site_config(1, &server);
    config.refresh_interval = std::time::Duration::from_millis(50);
    let site = build_site(config);
    let mut refreshed = site.subscribe_refresh();

    site.start().await.unwrap();
    refreshed.changed().await.unwrap();
    refreshed.changed().await.unwrap();
    site.stop().await;

    let requests = server.received_requests().await.unwrap().len();
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), requests);
}

#[tokio::test]
async fn test_zero_refresh_interval_is_rejected() {
    let server = MockServer::start().await;
    let mut config = site_config(1, &server);
    config.refresh_interval = Duration::ZERO;
    let site = build_site(config);

    assert!(matches!(
        site.start().await.unwrap_err(),
        CoreError::Config { .. }
    ));
    assert!(!site.is_started().await);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_after_partial_start_stops_running_sites() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let running = build_site(site_config(1, &server));
    let mut never = site_config(2, &server);
    never.refresh_interval = Duration::ZERO;

    let manager = SiteManager::new([running.clone(), build_site(never)]);
    assert!(matches!(
        manager.start().await.unwrap_err(),
        CoreError::SitesFailedToStart { ref failed } if failed == &[2]
    ));
    assert_eq!(manager.state(), ManagerState::NotStarted);
    assert!(running.is_started().await);

    manager.stop().await;
    assert_eq!(manager.state(), ManagerState::Stopped);
    assert!(!running.is_started().await);
}
