use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::VoteType;

/// A single member's ballot slot on one election. `vote` stays None
/// until the member casts; delegation repoints pending slots to another
/// member rather than deleting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: i64,
    pub election_id: i64,
    pub dac_user_id: i64,
    pub vote: Option<bool>,
    pub rationale: Option<String>,
    pub vote_type: VoteType,
    pub create_date: DateTime<Utc>,
    pub update_date: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub has_concerns: Option<bool>,
}

impl Vote {
    /// Not yet cast.
    pub fn is_pending(&self) -> bool {
        self.vote.is_none()
    }
}
