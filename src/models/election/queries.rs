use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{Election, ElectionReview};
use crate::errors::GovError;
use crate::models::enums::{ElectionStatus, ElectionType};
use crate::models::vote;

const SELECT_ELECTION: &str = "SELECT election_id, election_type, status, reference_id, \
    dataset_id, archived, version, create_date, last_update, final_vote, final_rationale, \
    final_vote_date, final_access_vote FROM election";

#[derive(sqlx::FromRow)]
struct ElectionRow {
    election_id: i64,
    election_type: String,
    status: String,
    reference_id: String,
    dataset_id: i64,
    archived: bool,
    version: i64,
    create_date: DateTime<Utc>,
    last_update: Option<DateTime<Utc>>,
    final_vote: Option<bool>,
    final_rationale: Option<String>,
    final_vote_date: Option<DateTime<Utc>>,
    final_access_vote: Option<bool>,
}

fn row_to_election(row: ElectionRow) -> Result<Election, GovError> {
    Ok(Election {
        election_id: row.election_id,
        election_type: row.election_type.parse().map_err(GovError::Decode)?,
        status: row.status.parse().map_err(GovError::Decode)?,
        reference_id: row.reference_id,
        dataset_id: row.dataset_id,
        archived: row.archived,
        version: row.version,
        create_date: row.create_date,
        last_update: row.last_update,
        final_vote: row.final_vote,
        final_rationale: row.final_rationale,
        final_vote_date: row.final_vote_date,
        final_access_vote: row.final_access_vote,
    })
}

/// Open a new review cycle. The version picks up where previous
/// (archived) cycles for the same key left off. The partial unique
/// index on (reference_id, election_type) rejects a second live row.
pub async fn create(
    conn: &mut SqliteConnection,
    election_type: ElectionType,
    reference_id: &str,
    dataset_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO election (election_type, status, reference_id, dataset_id, archived, version, create_date) \
         VALUES (?1, 'Open', ?2, ?3, 0, \
                 (SELECT coalesce(MAX(version), 0) + 1 FROM election \
                  WHERE reference_id = ?2 AND election_type = ?1), \
                 ?4) \
         RETURNING election_id",
    )
    .bind(election_type.as_str())
    .bind(reference_id)
    .bind(dataset_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    election_id: i64,
) -> Result<Option<Election>, GovError> {
    let sql = format!("{SELECT_ELECTION} WHERE election_id = ?1");
    let row = sqlx::query_as::<_, ElectionRow>(&sql)
        .bind(election_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(row_to_election).transpose()
}

pub async fn find_by_ids(
    conn: &mut SqliteConnection,
    election_ids: &[i64],
) -> Result<Vec<Election>, GovError> {
    if election_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; election_ids.len()].join(", ");
    let sql = format!("{SELECT_ELECTION} WHERE election_id IN ({placeholders}) ORDER BY election_id");
    let mut query = sqlx::query_as::<_, ElectionRow>(&sql);
    for id in election_ids {
        query = query.bind(*id);
    }
    let rows = query.fetch_all(&mut *conn).await?;
    rows.into_iter().map(row_to_election).collect()
}

/// The single non-archived election for a (reference, type) key, if any.
pub async fn find_active_for_reference(
    conn: &mut SqliteConnection,
    reference_id: &str,
    election_type: ElectionType,
) -> Result<Option<Election>, GovError> {
    let sql = format!(
        "{SELECT_ELECTION} WHERE reference_id = ?1 AND election_type = ?2 AND archived = 0"
    );
    let row = sqlx::query_as::<_, ElectionRow>(&sql)
        .bind(reference_id)
        .bind(election_type.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(row_to_election).transpose()
}

/// Every election ever held for a reference, archived history included.
pub async fn find_by_reference(
    conn: &mut SqliteConnection,
    reference_id: &str,
) -> Result<Vec<Election>, GovError> {
    let sql = format!("{SELECT_ELECTION} WHERE reference_id = ?1 ORDER BY election_id");
    let rows = sqlx::query_as::<_, ElectionRow>(&sql)
        .bind(reference_id)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(row_to_election).collect()
}

/// Close an election off the back of a cast FINAL vote.
pub async fn close_with_final_vote(
    conn: &mut SqliteConnection,
    election_id: i64,
    value: bool,
    rationale: Option<&str>,
    final_access_vote: Option<bool>,
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    sqlx::query(
        "UPDATE election SET status = 'Closed', final_vote = ?2, final_vote_date = ?3, \
         final_rationale = ?4, final_access_vote = ?5, last_update = ?3 \
         WHERE election_id = ?1",
    )
    .bind(election_id)
    .bind(value)
    .bind(now)
    .bind(rationale)
    .bind(final_access_vote)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Administrative cancellation. Only open elections can be canceled.
pub async fn cancel(
    conn: &mut SqliteConnection,
    election_id: i64,
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT status FROM election WHERE election_id = ?1")
            .bind(election_id)
            .fetch_optional(&mut *conn)
            .await?;
    let status = match row {
        Some(row) => row.0.parse::<ElectionStatus>().map_err(GovError::Decode)?,
        None => return Err(GovError::NotFound(format!("election {election_id}"))),
    };
    if status != ElectionStatus::Open {
        return Err(GovError::Conflict(format!(
            "election {election_id} is {status}; only open elections can be canceled"
        )));
    }
    sqlx::query("UPDATE election SET status = 'Canceled', last_update = ?2 WHERE election_id = ?1")
        .bind(election_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Retire an election row to history, freeing its (reference, type) key.
pub async fn archive(
    conn: &mut SqliteConnection,
    election_id: i64,
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    let result =
        sqlx::query("UPDATE election SET archived = 1, last_update = ?2 WHERE election_id = ?1")
            .bind(election_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(GovError::NotFound(format!("election {election_id}")));
    }
    Ok(())
}

/// Cancel and archive in one step, so the key is immediately free for a
/// replacement cycle.
pub async fn cancel_and_archive(
    conn: &mut SqliteConnection,
    election_id: i64,
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    cancel(&mut *conn, election_id, now).await?;
    archive(&mut *conn, election_id, now).await?;
    Ok(())
}

/// System-wide count of open elections, all types.
pub async fn count_open(conn: &mut SqliteConnection) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM election WHERE status = 'Open'")
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.0)
}

/// Ids of open elections of the given types over the given references.
pub async fn find_open_by_references(
    conn: &mut SqliteConnection,
    reference_ids: &[String],
    election_types: &[ElectionType],
) -> Result<Vec<i64>, GovError> {
    if reference_ids.is_empty() || election_types.is_empty() {
        return Ok(Vec::new());
    }
    let type_list = election_types
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; reference_ids.len()].join(", ");
    let sql = format!(
        "SELECT election_id FROM election \
         WHERE status = 'Open' AND election_type IN ({type_list}) \
           AND reference_id IN ({placeholders}) \
         ORDER BY election_id"
    );
    let mut query = sqlx::query_as::<_, (i64,)>(&sql);
    for reference_id in reference_ids {
        query = query.bind(reference_id.as_str());
    }
    let rows = query.fetch_all(&mut *conn).await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Election plus its full ballot.
pub async fn load_review(
    conn: &mut SqliteConnection,
    election_id: i64,
) -> Result<Option<ElectionReview>, GovError> {
    let election = match find_by_id(&mut *conn, election_id).await? {
        Some(election) => election,
        None => return Ok(None),
    };
    let votes = vote::queries::find_by_election(&mut *conn, election_id).await?;
    Ok(Some(ElectionReview { election, votes }))
}
