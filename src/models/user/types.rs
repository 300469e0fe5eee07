use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::RoleName;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub email: String,
    pub display_name: String,
    pub create_date: DateTime<Utc>,
}

/// One role held (or requested) by a user. Committee roles carry the
/// DAC they apply to; global roles have `dac_id` None.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: RoleName,
    pub dac_id: Option<i64>,
}

impl RoleAssignment {
    pub fn global(role: RoleName) -> Self {
        RoleAssignment { role, dac_id: None }
    }

    pub fn in_dac(role: RoleName, dac_id: i64) -> Self {
        RoleAssignment {
            role,
            dac_id: Some(dac_id),
        }
    }
}

/// One element of a role change request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoleChange {
    /// The origin user's complete desired role set; current roles not
    /// listed here are relinquished.
    SelfUpdate { roles: Vec<RoleAssignment> },
    /// Receives relinquished committee seats and their pending votes.
    DelegateTo { user_id: i64 },
    /// Receives relinquished dataset ownership and pending data-owner votes.
    AlternateDataOwner { user_id: i64 },
}

/// A role update for one user, applied atomically by the delegation
/// handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangeRequest {
    pub origin_user_id: i64,
    pub changes: Vec<RoleChange>,
}
