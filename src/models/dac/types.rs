use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::RoleName;

/// A data access committee.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dac {
    pub dac_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub create_date: DateTime<Utc>,
}

/// A voting member of a DAC, as resolved at election creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DacMember {
    pub user_id: i64,
    pub display_name: String,
    pub email: String,
    pub role: RoleName,
}
