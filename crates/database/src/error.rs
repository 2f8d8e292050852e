//! Errors from the coaching store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlite: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// No row for the given key, or the row belongs to another user.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A unique key was taken, e.g. a second briefing for one session.
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
