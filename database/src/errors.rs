use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown field `{field}` for {model}")]
    UnknownField { model: &'static str, field: String },

    #[error("{0} record has not been saved")]
    NotPersisted(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl Error {
    /// True when the backing store rejected a write because of a unique,
    /// foreign-key, not-null or check constraint.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation()
                    || db_err.code().is_some_and(|code| {
                        // SQLITE_CONSTRAINT and its extended codes
                        code == "19" || code.parse::<i32>().is_ok_and(|c| c & 0xff == 19)
                    })
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
