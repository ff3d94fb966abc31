// Access level, area and department endpoints

use crate::client::Net2Client;
use crate::error::Error;
use crate::models::{AccessLevelRecord, AreaRecord, DepartmentRecord};

impl Net2Client {
    /// List named access levels.
    ///
    /// `GET /api/v1/accesslevels`
    pub async fn list_access_levels(&self) -> Result<Vec<AccessLevelRecord>, Error> {
        self.get_json("api/v1/accesslevels", &[]).await
    }

    /// List areas that can be granted individually.
    ///
    /// `GET /api/v1/accesslevels/areas`
    pub async fn list_areas(&self) -> Result<Vec<AreaRecord>, Error> {
        self.get_json("api/v1/accesslevels/areas", &[]).await
    }

    /// List departments.
    ///
    /// `GET /api/v1/departments`
    pub async fn list_departments(&self) -> Result<Vec<DepartmentRecord>, Error> {
        self.get_json("api/v1/departments", &[]).await
    }
}
