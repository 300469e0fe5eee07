use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::types::{RoleAssignment, User};
use crate::errors::GovError;
use crate::models::enums::RoleName;

pub async fn create(
    conn: &mut SqliteConnection,
    email: &str,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO users (email, display_name, create_date) VALUES (?1, ?2, ?3) \
         RETURNING user_id",
    )
    .bind(email)
    .bind(display_name)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<User>, GovError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT user_id, email, display_name, create_date FROM users WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

/// All roles held by a user, committee roles with their DAC scope.
pub async fn find_roles(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<RoleAssignment>, GovError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        role: String,
        dac_id: Option<i64>,
    }

    let rows = sqlx::query_as::<_, Row>(
        "SELECT role, dac_id FROM user_role WHERE user_id = ?1 ORDER BY user_role_id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let role = row.role.parse::<RoleName>().map_err(GovError::Decode)?;
            Ok(RoleAssignment {
                role,
                dac_id: row.dac_id,
            })
        })
        .collect()
}

pub async fn has_role(
    conn: &mut SqliteConnection,
    user_id: i64,
    assignment: RoleAssignment,
) -> Result<bool, GovError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM user_role WHERE user_id = ?1 AND role = ?2 AND dac_id IS ?3",
    )
    .bind(user_id)
    .bind(assignment.role.as_str())
    .bind(assignment.dac_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0 > 0)
}

pub async fn add_role(
    conn: &mut SqliteConnection,
    user_id: i64,
    assignment: RoleAssignment,
) -> Result<(), GovError> {
    sqlx::query("INSERT INTO user_role (user_id, role, dac_id) VALUES (?1, ?2, ?3)")
        .bind(user_id)
        .bind(assignment.role.as_str())
        .bind(assignment.dac_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Remove one role assignment. Removing a role the user does not hold
/// is a no-op.
pub async fn remove_role(
    conn: &mut SqliteConnection,
    user_id: i64,
    assignment: RoleAssignment,
) -> Result<(), GovError> {
    sqlx::query("DELETE FROM user_role WHERE user_id = ?1 AND role = ?2 AND dac_id IS ?3")
        .bind(user_id)
        .bind(assignment.role.as_str())
        .bind(assignment.dac_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// System-wide number of users holding the Admin role.
pub async fn count_admins(conn: &mut SqliteConnection) -> Result<i64, GovError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(DISTINCT user_id) FROM user_role WHERE role = 'Admin'",
    )
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.0)
}
