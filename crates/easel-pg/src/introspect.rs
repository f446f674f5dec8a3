//! Schema introspection: table listing, per-table reports, indexes.

use serde::Serialize;
use serde_json::Value;
use sqlx::{Connection, PgConnection};
use tracing::warn;

use crate::error::DbError;
use crate::query::{Database, fetch_json_rows};

/// Column metadata with comments, joined through `pg_description`.
/// `$1` is the table name, used both for the column filter and the
/// comment oid lookup.
const COLUMN_QUERY: &str = "SELECT \
        c.column_name, \
        c.data_type, \
        c.is_nullable, \
        c.column_default, \
        c.character_maximum_length, \
        c.numeric_precision, \
        c.numeric_scale, \
        pd.description \
    FROM information_schema.columns c \
    LEFT JOIN pg_catalog.pg_description pd \
        ON pd.objsubid = c.ordinal_position \
        AND pd.objoid = ( \
            SELECT pc.oid \
            FROM pg_catalog.pg_class pc \
            JOIN pg_catalog.pg_namespace pn ON pn.oid = pc.relnamespace \
            WHERE pc.relname = $1 AND pn.nspname = c.table_schema \
        ) \
    WHERE c.table_name = $1 \
        AND c.table_schema NOT IN ('information_schema', 'pg_catalog') \
    ORDER BY c.ordinal_position";

const CONSTRAINT_QUERY: &str = "SELECT \
        tc.constraint_name, \
        tc.constraint_type, \
        kcu.column_name \
    FROM information_schema.table_constraints tc \
    JOIN information_schema.key_column_usage kcu \
        ON tc.constraint_name = kcu.constraint_name \
    WHERE tc.table_name = $1 \
        AND tc.table_schema NOT IN ('information_schema', 'pg_catalog')";

const INDEX_QUERY: &str = "SELECT indexname, indexdef \
    FROM pg_indexes \
    WHERE tablename = $1 \
        AND schemaname NOT IN ('information_schema', 'pg_catalog') \
    ORDER BY indexname";

const TABLES_QUERY: &str = "SELECT schemaname, tablename, tableowner \
    FROM pg_tables \
    WHERE schemaname NOT IN ('information_schema', 'pg_catalog') \
    ORDER BY schemaname, tablename";

/// Listing of all user tables in the connected database.
#[derive(Debug, Clone, Serialize)]
pub struct TablesSummary {
    pub database: String,
    pub tables: Vec<Value>,
    pub total_count: usize,
}

/// Columns, constraints and row count for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub table_name: String,
    /// Row count, or the string `"unavailable"` when it cannot be read.
    pub row_count: Value,
    pub columns: Vec<Value>,
    pub constraints: Vec<Value>,
}

/// Index listing for one table.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub table_name: String,
    pub indexes: Vec<Value>,
    pub total_count: usize,
}

impl Database {
    /// List user tables, excluding the system schemas.
    pub async fn list_tables(&self) -> Result<TablesSummary, DbError> {
        let mut conn = self.connect().await?;
        let result = collect_tables(&mut conn).await;
        let _ = conn.close().await;
        result
    }

    /// Columns, constraints and row count for a table.
    ///
    /// The name is validated against the live table list before any
    /// statement interpolates it.
    pub async fn table_report(&self, table: &str) -> Result<TableReport, DbError> {
        let mut conn = self.connect().await?;
        let result = self.collect_table_report(&mut conn, table).await;
        let _ = conn.close().await;
        result
    }

    /// Index definitions for a table. An unknown name yields an empty
    /// listing, matching the parameterized catalog query underneath.
    pub async fn table_indexes(&self, table: &str) -> Result<IndexReport, DbError> {
        let mut conn = self.connect().await?;
        let result = collect_indexes(&mut conn, table).await;
        let _ = conn.close().await;
        result
    }

    /// Check a table name against the live table list.
    ///
    /// Interpolated identifiers are only ever drawn from this list, which
    /// keeps caller-supplied names out of statement text entirely.
    pub(crate) async fn ensure_known_table(
        &self,
        conn: &mut PgConnection,
        table: &str,
    ) -> Result<(), DbError> {
        let known: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM pg_tables WHERE tablename = $1 \
             AND schemaname NOT IN ('information_schema', 'pg_catalog')",
        )
        .bind(table)
        .fetch_optional(conn)
        .await
        .map_err(DbError::Execution)?;

        match known {
            Some(_) => Ok(()),
            None => Err(DbError::UnknownTable(table.to_string())),
        }
    }

    async fn collect_table_report(
        &self,
        conn: &mut PgConnection,
        table: &str,
    ) -> Result<TableReport, DbError> {
        self.ensure_known_table(&mut *conn, table).await?;

        let columns = fetch_json_rows(&mut *conn, COLUMN_QUERY, &[table]).await?;
        let constraints = fetch_json_rows(&mut *conn, CONSTRAINT_QUERY, &[table]).await?;

        // Count failure degrades to a sentinel; the rest of the report stands.
        let row_count = match count_rows(&mut *conn, table).await {
            Ok(n) => Value::from(n),
            Err(err) => {
                warn!(table, error = %err, "row count unavailable");
                Value::from("unavailable")
            }
        };

        Ok(TableReport {
            table_name: table.to_string(),
            row_count,
            columns,
            constraints,
        })
    }
}

async fn collect_tables(conn: &mut PgConnection) -> Result<TablesSummary, DbError> {
    let database: String = sqlx::query_scalar("SELECT current_database()")
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::Execution)?;

    let tables = fetch_json_rows(conn, TABLES_QUERY, &[]).await?;
    let total_count = tables.len();

    Ok(TablesSummary {
        database,
        tables,
        total_count,
    })
}

async fn collect_indexes(conn: &mut PgConnection, table: &str) -> Result<IndexReport, DbError> {
    let indexes = fetch_json_rows(conn, INDEX_QUERY, &[table]).await?;
    let total_count = indexes.len();

    Ok(IndexReport {
        table_name: table.to_string(),
        indexes,
        total_count,
    })
}

/// `SELECT COUNT(*)` with a validated, quoted identifier.
pub(crate) async fn count_rows(conn: &mut PgConnection, table: &str) -> Result<i64, DbError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    sqlx::query_scalar(&sql)
        .fetch_one(conn)
        .await
        .map_err(DbError::Execution)
}

/// Double-quote an identifier for interpolation. Callers must have
/// validated the name against the live table list first; quoting here
/// preserves case and tolerates reserved words.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
