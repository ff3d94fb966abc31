// Shared wiremock fixtures for net2-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use net2_core::{DepartmentPrefixes, FixedClock, Site, SiteConfig, SiteCredentials};

pub const QUERY_PATH: &str = "/api/v1/customquery/querydb";
pub const DEVICE_STATUS_SQL: &str = "SELECT Address, StatusFlag FROM devices";
pub const ACTIVE_USERS_SQL: &str = "SELECT * FROM UsersEx WHERE Active=1";

/// 2026-03-10 09:00:00 local.
pub fn now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2026-03-10T09:00:00", "%Y-%m-%dT%H:%M:%S").unwrap()
}

pub fn site_config(id: i64, server: &MockServer) -> SiteConfig {
    let mut config = SiteConfig::new(
        id,
        format!("Site {id}"),
        Url::parse(&server.uri()).unwrap(),
        SiteCredentials {
            client_id: "client".into(),
            username: "System engineer".into(),
            password: SecretString::from("net2"),
        },
    );
    config.refresh_interval = Duration::from_secs(3600);
    config.department_prefixes = DepartmentPrefixes {
        staff: Some("Staff".into()),
        visitors: Some("Visitor".into()),
        contractors: Some("Contractor".into()),
        cleaners: None,
        customers: None,
        cancelled: Some("Cancelled".into()),
    };
    config
}

pub fn build_site(config: SiteConfig) -> Arc<Site> {
    Site::with_clock(config, Arc::new(FixedClock(now()))).unwrap()
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/authorization/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token",
            "token_type": "bearer",
            "expires_in": 1800
        })))
        .mount(server)
        .await;
}

pub async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_query(server: &MockServer, sql: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("query", sql))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_access_levels(server: &MockServer) {
    mount_get(
        server,
        "/api/v1/accesslevels",
        json!([
            { "id": 1, "name": "Working hours" },
            { "id": 2, "name": "Anytime" }
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/v1/accesslevels/areas",
        json!([{ "areaID": 1, "name": "Server room" }]),
    )
    .await;
}

pub async fn mount_doors(server: &MockServer) {
    mount_get(
        server,
        "/api/v1/doors",
        json!([
            { "id": 101, "name": "Front door" },
            { "id": 102, "name": "Goods in" }
        ]),
    )
    .await;
    mount_query(
        server,
        DEVICE_STATUS_SQL,
        json!([
            { "Address": 101, "StatusFlag": 3 },
            { "Address": 102, "StatusFlag": 2 }
        ]),
    )
    .await;
}

pub async fn mount_departments(server: &MockServer) {
    mount_get(
        server,
        "/api/v1/departments",
        json!([
            { "id": 10, "name": "Staff-Eng" },
            { "id": 20, "name": "Visitor" },
            { "id": 30, "name": "Cancelled" }
        ]),
    )
    .await;
}

pub fn user_row(id: i64, first: &str, department: (i64, &str), expiry: &str) -> Value {
    json!({
        "userID": id,
        "UserGUID": format!("guid-{id}"),
        "FirstName": first,
        "Surname": "Tester",
        "ExpiryDate": expiry,
        "DepartmentID": department.0,
        "DepartmentName": department.1,
        "AccessLevelName": "Working hours",
        "lastAccessTime": "2026-03-10T08:15:00"
    })
}

pub fn default_users() -> Value {
    json!([
        user_row(7, "Ada", (10, "Staff-Eng"), "2027-01-01T00:00:00"),
        user_row(8, "Bo", (20, "Visitor"), "2026-03-01T23:59:59"),
        user_row(9, "Cy", (30, "Cancelled"), "0001-01-01T00:00:00")
    ])
}

pub async fn mount_users(server: &MockServer, rows: Value) {
    mount_query(server, ACTIVE_USERS_SQL, rows).await;
}

/// Token plus every endpoint a full refresh touches.
pub async fn mount_site(server: &MockServer) {
    mount_token(server).await;
    mount_access_levels(server).await;
    mount_doors(server).await;
    mount_departments(server).await;
    mount_users(server, default_users()).await;
}

/// A refreshed site backed by a fully mocked server.
pub async fn ready_site(id: i64) -> (MockServer, Arc<Site>) {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let site = build_site(site_config(id, &server));
    assert!(site.refresh_all().await.is_complete());
    (server, site)
}

/// Paths of every non-token request the server has seen, in arrival order.
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| !r.url.path().ends_with("/tokens"))
        .map(|r| match r.url.query_pairs().find(|(k, _)| k == "query") {
            Some((_, sql)) => sql.into_owned(),
            None => r.url.path().to_owned(),
        })
        .collect()
}
