//! Error types for the database layer.

use thiserror::Error;

use crate::guard::GuardRejection;

/// Failures from the query and introspection layers.
///
/// Connection establishment and statement execution are distinct variants
/// so the tool boundary can label them differently.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("SQL execution failed: {0}")]
    Execution(#[source] sqlx::Error),

    /// The table name is not in the live table list. Raised before any
    /// statement interpolating the name is built.
    #[error("unknown table: '{0}'")]
    UnknownTable(String),

    #[error("{0}")]
    Rejected(#[from] GuardRejection),
}
