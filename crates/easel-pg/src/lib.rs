//! Read-only PostgreSQL access for the easel MCP server.
//!
//! Three layers: a textual [`guard`] that turns away non-SELECT
//! statements before any I/O, a per-call [`query`] layer with no
//! pooling, and [`introspect`]/[`stats`] for the schema resources.
//! Interpolated identifiers are restricted to names validated against
//! the live table list; everything else is bound as a parameter.

pub mod error;
pub mod guard;
pub mod introspect;
pub mod query;
pub mod stats;

pub use error::DbError;
pub use guard::{GuardRejection, classify};
pub use introspect::{IndexReport, TableReport, TablesSummary};
pub use query::{Database, MAX_ROWS, MAX_SAMPLE_LIMIT, QueryResult, SampleData};
pub use stats::TableStats;
