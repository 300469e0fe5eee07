use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{Dataset, DatasetAssociation};
use crate::errors::GovError;

pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    dac_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO dataset (name, dac_id, create_date) VALUES (?1, ?2, ?3) \
         RETURNING dataset_id",
    )
    .bind(name)
    .bind(dac_id)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    dataset_id: i64,
) -> Result<Option<Dataset>, GovError> {
    let dataset = sqlx::query_as::<_, Dataset>(
        "SELECT dataset_id, name, dac_id, create_date FROM dataset WHERE dataset_id = ?1",
    )
    .bind(dataset_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(dataset)
}

/// DAC responsible for a dataset, if the dataset is registered.
pub async fn resolve_dac_id(
    conn: &mut SqliteConnection,
    dataset_id: i64,
) -> Result<Option<i64>, GovError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT dac_id FROM dataset WHERE dataset_id = ?1")
        .bind(dataset_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| r.0))
}

pub async fn add_association(
    conn: &mut SqliteConnection,
    dataset_id: i64,
    user_id: i64,
) -> Result<(), GovError> {
    sqlx::query("INSERT INTO dataset_association (dataset_id, user_id) VALUES (?1, ?2)")
        .bind(dataset_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn find_associations_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<DatasetAssociation>, GovError> {
    let rows = sqlx::query_as::<_, DatasetAssociation>(
        "SELECT dataset_id, user_id FROM dataset_association \
         WHERE user_id = ?1 ORDER BY dataset_id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Move every dataset association from one owner to another. Datasets
/// the new owner already holds are dropped from the old owner instead
/// of duplicated.
pub async fn reassign_associations(
    conn: &mut SqliteConnection,
    from_user_id: i64,
    to_user_id: i64,
) -> Result<u64, GovError> {
    sqlx::query(
        "DELETE FROM dataset_association \
         WHERE user_id = ?1 AND dataset_id IN \
            (SELECT dataset_id FROM dataset_association WHERE user_id = ?2)",
    )
    .bind(from_user_id)
    .bind(to_user_id)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query("UPDATE dataset_association SET user_id = ?2 WHERE user_id = ?1")
        .bind(from_user_id)
        .bind(to_user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_associations_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<u64, GovError> {
    let result = sqlx::query("DELETE FROM dataset_association WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
