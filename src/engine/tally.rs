//! Applies vote values to ballots. Casting a FINAL vote is the one and
//! only way an election moves from Open to Closed.

use std::collections::HashSet;

use chrono::Utc;

use crate::db::DbPool;
use crate::errors::GovError;
use crate::models::enums::{ElectionStatus, ElectionType, VoteType};
use crate::models::vote::Vote;
use crate::models::{election, vote};

pub struct VoteTallyEngine {
    pool: DbPool,
}

impl VoteTallyEngine {
    pub fn new(pool: DbPool) -> Self {
        VoteTallyEngine { pool }
    }

    /// Record the same value (and optional rationale) on every listed
    /// vote. All parent elections must be open at the start of the batch
    /// or nothing is written. FINAL votes close their election as a side
    /// effect; on DataAccess elections the value is mirrored into
    /// `final_access_vote`.
    ///
    /// Returns the updated votes in id order.
    pub async fn update_votes_with_value(
        &self,
        vote_ids: &[i64],
        value: bool,
        rationale: Option<&str>,
    ) -> Result<Vec<Vote>, GovError> {
        if vote_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let votes = vote::queries::find_by_ids(&mut tx, vote_ids).await?;
        let found: HashSet<i64> = votes.iter().map(|v| v.vote_id).collect();
        for vote_id in vote_ids {
            if !found.contains(vote_id) {
                return Err(GovError::NotFound(format!("vote {vote_id}")));
            }
        }

        let mut election_ids: Vec<i64> = votes.iter().map(|v| v.election_id).collect();
        election_ids.sort_unstable();
        election_ids.dedup();
        let elections = election::queries::find_by_ids(&mut tx, &election_ids).await?;
        for election in &elections {
            if election.status != ElectionStatus::Open {
                return Err(GovError::Conflict(format!(
                    "election {} is {}; votes can only be updated on open elections",
                    election.election_id, election.status
                )));
            }
        }

        let now = Utc::now();
        for vote in &votes {
            vote::queries::update_value(&mut tx, vote.vote_id, value, rationale, now).await?;
        }

        let mut closed: Vec<i64> = Vec::new();
        for vote in &votes {
            if vote.vote_type != VoteType::Final || closed.contains(&vote.election_id) {
                continue;
            }
            let election = elections
                .iter()
                .find(|e| e.election_id == vote.election_id)
                .ok_or_else(|| GovError::NotFound(format!("election {}", vote.election_id)))?;
            let final_access_vote = if election.election_type == ElectionType::DataAccess {
                Some(value)
            } else {
                None
            };
            election::queries::close_with_final_vote(
                &mut tx,
                election.election_id,
                value,
                rationale,
                final_access_vote,
                now,
            )
            .await?;
            closed.push(election.election_id);
            log::info!("Election {} closed by final vote {value}", election.election_id);
        }

        let updated = vote::queries::find_by_ids(&mut tx, vote_ids).await?;
        tx.commit().await?;
        Ok(updated)
    }
}
