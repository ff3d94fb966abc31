// User endpoints
//
// Users are read through the server-side custom query endpoint so that the
// local-identifier custom field can be projected into the same row. Writes
// go through the regular REST resources.

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::client::{Net2Client, ensure_success};
use crate::error::Error;
use crate::models::{CustomFieldDefinition, DepartmentRecord, PermissionSet, UserRow, UserUpdate};

impl Net2Client {
    /// Run a query through `GET /api/v1/customquery/querydb`.
    pub async fn custom_query<T: serde::de::DeserializeOwned>(
        &self,
        sql: &str,
    ) -> Result<Vec<T>, Error> {
        debug!(query = sql, "custom query");
        self.get_json("api/v1/customquery/querydb", &[("query", sql)])
            .await
    }

    /// Fetch user rows matching a `UsersEx` query.
    pub async fn query_users(&self, sql: &str) -> Result<Vec<UserRow>, Error> {
        self.custom_query(sql).await
    }

    /// List custom field definitions.
    ///
    /// `GET /api/v1/users/customfieldnames`
    pub async fn custom_field_names(&self) -> Result<Vec<CustomFieldDefinition>, Error> {
        self.get_json("api/v1/users/customfieldnames", &[]).await
    }

    /// Fetch a user's exact permission set.
    ///
    /// `GET /api/v1/users/{id}/doorpermissionset`
    pub async fn door_permission_set(&self, user_id: i64) -> Result<PermissionSet, Error> {
        self.get_json(&format!("api/v1/users/{user_id}/doorpermissionset"), &[])
            .await
    }

    /// Replace a user's permission set.
    ///
    /// `PUT /api/v1/users/{id}/doorpermissionset`
    pub async fn set_door_permission_set(
        &self,
        user_id: i64,
        permissions: &PermissionSet,
    ) -> Result<(), Error> {
        self.send_command(
            Method::PUT,
            &format!("api/v1/users/{user_id}/doorpermissionset"),
            permissions,
            &[StatusCode::OK, StatusCode::NO_CONTENT],
        )
        .await
    }

    /// Update a user's name and expiry.
    ///
    /// `PUT /api/v1/users/{id}`
    pub async fn update_user(&self, update: &UserUpdate) -> Result<(), Error> {
        self.send_command(
            Method::PUT,
            &format!("api/v1/users/{}", update.id),
            update,
            &[StatusCode::OK],
        )
        .await
    }

    /// Move a user into a department.
    ///
    /// `PUT /api/v1/users/{id}/departments`
    pub async fn set_user_department(
        &self,
        user_id: i64,
        department: &DepartmentRecord,
    ) -> Result<(), Error> {
        self.send_command(
            Method::PUT,
            &format!("api/v1/users/{user_id}/departments"),
            department,
            &[StatusCode::NO_CONTENT],
        )
        .await
    }

    /// Clear a user's anti-passback state.
    ///
    /// `POST /api/v1/commands/antipassback/reset`
    pub async fn reset_anti_passback(&self, user_id: i64) -> Result<(), Error> {
        self.send_command(
            Method::POST,
            "api/v1/commands/antipassback/reset",
            &json!({ "userId": user_id }),
            &[StatusCode::OK],
        )
        .await
    }

    /// Fetch a user's photo. Returns `None` when the server has no image.
    ///
    /// `GET /api/v1/users/{id}/image`
    pub async fn user_image(&self, user_id: i64) -> Result<Option<Bytes>, Error> {
        let resp = self
            .request::<()>(Method::GET, &format!("api/v1/users/{user_id}/image"), &[], None)
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        Ok(Some(resp.bytes().await.map_err(Error::Transport)?))
    }
}
