use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dataset under the governance of exactly one DAC.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dataset {
    pub dataset_id: i64,
    pub name: String,
    pub dac_id: i64,
    pub create_date: DateTime<Utc>,
}

/// Data-owner association between a user and a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DatasetAssociation {
    pub dataset_id: i64,
    pub user_id: i64,
}
