use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{Dar, DarCollection, DarEntry};
use crate::errors::GovError;

pub async fn create(
    conn: &mut SqliteConnection,
    reference_id: &str,
    collection_id: i64,
    user_id: i64,
    dataset_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<(), GovError> {
    sqlx::query(
        "INSERT INTO dar (reference_id, collection_id, user_id, create_date) \
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(reference_id)
    .bind(collection_id)
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for dataset_id in dataset_ids {
        sqlx::query("INSERT INTO dar_dataset (reference_id, dataset_id) VALUES (?1, ?2)")
            .bind(reference_id)
            .bind(dataset_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn find_by_reference(
    conn: &mut SqliteConnection,
    reference_id: &str,
) -> Result<Option<Dar>, GovError> {
    let dar = sqlx::query_as::<_, Dar>(
        "SELECT reference_id, collection_id, user_id, create_date \
         FROM dar WHERE reference_id = ?1",
    )
    .bind(reference_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(dar)
}

/// Load a collection as its (reference, dataset) pairs, in submission
/// order. A collection id with no requests yields an empty entry list.
pub async fn find_collection(
    conn: &mut SqliteConnection,
    collection_id: i64,
) -> Result<DarCollection, GovError> {
    let entries = sqlx::query_as::<_, DarEntry>(
        "SELECT d.reference_id, dd.dataset_id \
         FROM dar d \
         JOIN dar_dataset dd ON dd.reference_id = d.reference_id \
         WHERE d.collection_id = ?1 \
         ORDER BY d.create_date, d.reference_id, dd.dataset_id",
    )
    .bind(collection_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(DarCollection {
        collection_id,
        entries,
    })
}

/// Reference ids of every request submitted by the given researcher.
pub async fn find_reference_ids_by_researcher(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<String>, GovError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT reference_id FROM dar WHERE user_id = ?1 ORDER BY reference_id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}
