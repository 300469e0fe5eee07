use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::{ElectionStatus, ElectionType};
use crate::models::vote::Vote;

/// One review cycle for a (reference, type) key. At most one
/// non-archived row exists per key; archived rows are history and
/// `version` counts cycles over the key's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    pub election_id: i64,
    pub election_type: ElectionType,
    pub status: ElectionStatus,
    pub reference_id: String,
    pub dataset_id: i64,
    pub archived: bool,
    pub version: i64,
    pub create_date: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
    pub final_vote: Option<bool>,
    pub final_rationale: Option<String>,
    pub final_vote_date: Option<DateTime<Utc>>,
    /// Mirror of the final vote value, kept on DataAccess elections only.
    pub final_access_vote: Option<bool>,
}

/// An election with its full ballot, so callers never see partial state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionReview {
    pub election: Election,
    pub votes: Vec<Vote>,
}
