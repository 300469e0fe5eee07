use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::Vote;
use crate::errors::GovError;
use crate::models::enums::VoteType;

const SELECT_VOTE: &str = "SELECT vote_id, election_id, dac_user_id, vote, rationale, \
    type AS vote_type, create_date, update_date, reminder_sent, has_concerns FROM vote";

#[derive(sqlx::FromRow)]
struct VoteRow {
    vote_id: i64,
    election_id: i64,
    dac_user_id: i64,
    vote: Option<bool>,
    rationale: Option<String>,
    vote_type: String,
    create_date: DateTime<Utc>,
    update_date: Option<DateTime<Utc>>,
    reminder_sent: bool,
    has_concerns: Option<bool>,
}

fn row_to_vote(row: VoteRow) -> Result<Vote, GovError> {
    Ok(Vote {
        vote_id: row.vote_id,
        election_id: row.election_id,
        dac_user_id: row.dac_user_id,
        vote: row.vote,
        rationale: row.rationale,
        vote_type: row.vote_type.parse().map_err(GovError::Decode)?,
        create_date: row.create_date,
        update_date: row.update_date,
        reminder_sent: row.reminder_sent,
        has_concerns: row.has_concerns,
    })
}

fn quoted_type_list(vote_types: &[VoteType]) -> String {
    vote_types
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Seed one pending ballot slot.
pub async fn create(
    conn: &mut SqliteConnection,
    election_id: i64,
    dac_user_id: i64,
    vote_type: VoteType,
    now: DateTime<Utc>,
) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO vote (election_id, dac_user_id, type, create_date, reminder_sent) \
         VALUES (?1, ?2, ?3, ?4, 0) \
         RETURNING vote_id",
    )
    .bind(election_id)
    .bind(dac_user_id)
    .bind(vote_type.as_str())
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    vote_id: i64,
) -> Result<Option<Vote>, GovError> {
    let sql = format!("{SELECT_VOTE} WHERE vote_id = ?1");
    let row = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(vote_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(row_to_vote).transpose()
}

pub async fn find_by_ids(
    conn: &mut SqliteConnection,
    vote_ids: &[i64],
) -> Result<Vec<Vote>, GovError> {
    if vote_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; vote_ids.len()].join(", ");
    let sql = format!("{SELECT_VOTE} WHERE vote_id IN ({placeholders}) ORDER BY vote_id");
    let mut query = sqlx::query_as::<_, VoteRow>(&sql);
    for id in vote_ids {
        query = query.bind(*id);
    }
    let rows = query.fetch_all(&mut *conn).await?;
    rows.into_iter().map(row_to_vote).collect()
}

pub async fn find_by_election(
    conn: &mut SqliteConnection,
    election_id: i64,
) -> Result<Vec<Vote>, GovError> {
    let sql = format!("{SELECT_VOTE} WHERE election_id = ?1 ORDER BY vote_id");
    let rows = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(election_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(row_to_vote).collect()
}

/// Write a cast value and rationale onto a ballot slot.
pub async fn update_value(
    conn: &mut SqliteConnection,
    vote_id: i64,
    value: bool,
    rationale: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    sqlx::query("UPDATE vote SET vote = ?2, rationale = ?3, update_date = ?4 WHERE vote_id = ?1")
        .bind(vote_id)
        .bind(value)
        .bind(rationale)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Pending ballots a user still owes on open elections, restricted to
/// the given vote types and, for committee seats, to elections of the
/// seat's DAC.
pub async fn count_pending_for_seat(
    conn: &mut SqliteConnection,
    user_id: i64,
    vote_types: &[VoteType],
    dac_id: Option<i64>,
) -> Result<i64, GovError> {
    let type_list = quoted_type_list(vote_types);
    let sql = match dac_id {
        Some(_) => format!(
            "SELECT COUNT(*) FROM vote v \
             JOIN election e ON e.election_id = v.election_id \
             JOIN dataset d ON d.dataset_id = e.dataset_id \
             WHERE v.dac_user_id = ?1 AND v.vote IS NULL AND v.type IN ({type_list}) \
               AND e.status = 'Open' AND d.dac_id = ?2"
        ),
        None => format!(
            "SELECT COUNT(*) FROM vote v \
             JOIN election e ON e.election_id = v.election_id \
             WHERE v.dac_user_id = ?1 AND v.vote IS NULL AND v.type IN ({type_list}) \
               AND e.status = 'Open'"
        ),
    };
    let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(user_id);
    if let Some(dac_id) = dac_id {
        query = query.bind(dac_id);
    }
    let row = query.fetch_one(&mut *conn).await?;
    Ok(row.0)
}

/// Repoint pending ballots on open elections from one user to another.
/// Cast votes never move; no row is created or deleted. Returns how
/// many slots moved.
pub async fn reassign_pending(
    conn: &mut SqliteConnection,
    from_user_id: i64,
    to_user_id: i64,
    vote_types: &[VoteType],
    dac_id: Option<i64>,
) -> Result<u64, GovError> {
    let type_list = quoted_type_list(vote_types);
    let sql = match dac_id {
        Some(_) => format!(
            "UPDATE vote SET dac_user_id = ?2 \
             WHERE dac_user_id = ?1 AND vote IS NULL AND type IN ({type_list}) \
               AND election_id IN \
                  (SELECT e.election_id FROM election e \
                   JOIN dataset d ON d.dataset_id = e.dataset_id \
                   WHERE e.status = 'Open' AND d.dac_id = ?3)"
        ),
        None => format!(
            "UPDATE vote SET dac_user_id = ?2 \
             WHERE dac_user_id = ?1 AND vote IS NULL AND type IN ({type_list}) \
               AND election_id IN \
                  (SELECT election_id FROM election WHERE status = 'Open')"
        ),
    };
    let mut query = sqlx::query(&sql).bind(from_user_id).bind(to_user_id);
    if let Some(dac_id) = dac_id {
        query = query.bind(dac_id);
    }
    let result = query.execute(&mut *conn).await?;
    Ok(result.rows_affected())
}
