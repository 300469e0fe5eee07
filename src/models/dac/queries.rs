use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{Dac, DacMember};
use crate::errors::GovError;
use crate::models::enums::RoleName;

pub async fn create(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO dac (name, description, create_date) VALUES (?1, ?2, ?3) \
         RETURNING dac_id",
    )
    .bind(name)
    .bind(description)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    dac_id: i64,
) -> Result<Option<Dac>, GovError> {
    let dac = sqlx::query_as::<_, Dac>(
        "SELECT dac_id, name, description, create_date FROM dac WHERE dac_id = ?1",
    )
    .bind(dac_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(dac)
}

/// Chairpersons and members of a DAC.
pub async fn find_members(
    conn: &mut SqliteConnection,
    dac_id: i64,
) -> Result<Vec<DacMember>, GovError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        user_id: i64,
        display_name: String,
        email: String,
        role: String,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT u.user_id, u.display_name, u.email, ur.role \
         FROM user_role ur \
         JOIN users u ON u.user_id = ur.user_id \
         WHERE ur.dac_id = ?1 AND ur.role IN ('Chairperson', 'Member') \
         ORDER BY u.user_id",
    )
    .bind(dac_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let role = row.role.parse::<RoleName>().map_err(GovError::Decode)?;
            Ok(DacMember {
                user_id: row.user_id,
                display_name: row.display_name,
                email: row.email,
                role,
            })
        })
        .collect()
}

/// Users currently holding the Chairperson seat of a DAC.
pub async fn find_chairpersons(
    conn: &mut SqliteConnection,
    dac_id: i64,
) -> Result<Vec<i64>, GovError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT user_id FROM user_role \
         WHERE dac_id = ?1 AND role = 'Chairperson' \
         ORDER BY user_id",
    )
    .bind(dac_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|row| row.0).collect())
}
