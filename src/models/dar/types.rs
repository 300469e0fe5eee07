use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A data access request, identified by an opaque reference id and
/// grouped with its siblings under a collection.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dar {
    pub reference_id: String,
    pub collection_id: i64,
    pub user_id: i64,
    pub create_date: DateTime<Utc>,
}

/// One (reference, dataset) pair of a collection, the unit the
/// lifecycle engine creates elections for.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DarEntry {
    pub reference_id: String,
    pub dataset_id: i64,
}

/// A researcher's collection of data access requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DarCollection {
    pub collection_id: i64,
    pub entries: Vec<DarEntry>,
}
