use std::fmt;

#[derive(Debug)]
pub enum GovError {
    /// Input rejected before any write happened.
    Validation(String),
    /// The requested change collides with current lifecycle state.
    Conflict(String),
    NotFound(String),
    /// A stored discriminant column holds a value outside its closed set.
    Decode(String),
    Db(sqlx::Error),
}

impl fmt::Display for GovError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GovError::Validation(msg) => write!(f, "Validation error: {msg}"),
            GovError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            GovError::NotFound(what) => write!(f, "Not found: {what}"),
            GovError::Decode(msg) => write!(f, "Stored value error: {msg}"),
            GovError::Db(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl std::error::Error for GovError {}

impl From<sqlx::Error> for GovError {
    fn from(e: sqlx::Error) -> Self {
        GovError::Db(e)
    }
}

/// True when the database rejected a write for violating a unique index.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}
