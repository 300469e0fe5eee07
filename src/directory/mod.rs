//! Read-only lookups the engines depend on: dataset ownership and
//! user/committee membership. Both wrap the shared pool and are
//! injected into the engines at construction.

use crate::db::DbPool;
use crate::errors::GovError;
use crate::models::dac::DacMember;
use crate::models::user::RoleAssignment;
use crate::models::{dac, dataset, election, user};

#[derive(Clone)]
pub struct DatasetRegistry {
    pool: DbPool,
}

impl DatasetRegistry {
    pub fn new(pool: DbPool) -> Self {
        DatasetRegistry { pool }
    }

    /// DAC responsible for a dataset. Unknown datasets are an error: an
    /// election must never be created without a responsible committee.
    pub async fn resolve_dac_for_dataset(&self, dataset_id: i64) -> Result<i64, GovError> {
        let mut conn = self.pool.acquire().await?;
        dataset::queries::resolve_dac_id(&mut conn, dataset_id)
            .await?
            .ok_or_else(|| GovError::NotFound(format!("dataset {dataset_id}")))
    }
}

#[derive(Clone)]
pub struct UserRoleDirectory {
    pool: DbPool,
}

impl UserRoleDirectory {
    pub fn new(pool: DbPool) -> Self {
        UserRoleDirectory { pool }
    }

    /// Current chairpersons and members of a DAC.
    pub async fn find_dac_members(&self, dac_id: i64) -> Result<Vec<DacMember>, GovError> {
        let mut conn = self.pool.acquire().await?;
        dac::queries::find_members(&mut conn, dac_id).await
    }

    /// Every role the user holds, committee roles with their DAC scope.
    pub async fn find_roles_by_user_id(&self, user_id: i64) -> Result<Vec<RoleAssignment>, GovError> {
        let mut conn = self.pool.acquire().await?;
        user::queries::find_roles(&mut conn, user_id).await
    }

    /// Coarse system-wide gate: how many elections are open right now,
    /// regardless of type.
    pub async fn count_open_elections(&self) -> Result<i64, GovError> {
        let mut conn = self.pool.acquire().await?;
        election::queries::count_open(&mut conn).await
    }
}
