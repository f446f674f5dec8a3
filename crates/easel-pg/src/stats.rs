//! Numeric column statistics for `analyze_table_stats`.

use serde::Serialize;
use serde_json::{Map, Value, json};
use sqlx::{Connection, PgConnection};
use tracing::warn;

use crate::error::DbError;
use crate::introspect::{count_rows, quote_ident};
use crate::query::{Database, fetch_json_rows, row_to_json};

/// Numeric columns of a table, in declaration order. The type filter is
/// a fixed literal list, so only `$1` is bound.
const NUMERIC_COLUMNS_QUERY: &str = "SELECT column_name, data_type \
    FROM information_schema.columns \
    WHERE table_name = $1 \
        AND data_type IN ('integer', 'bigint', 'decimal', 'numeric', 'real', 'double precision') \
        AND table_schema NOT IN ('information_schema', 'pg_catalog') \
    ORDER BY ordinal_position";

/// Statistics envelope for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub table_name: String,
    pub basic_stats: Value,
    pub numeric_columns_stats: Map<String, Value>,
}

impl Database {
    /// Row count plus min/max/avg and null counts for every numeric
    /// column.
    ///
    /// A failure probing one column degrades to an error entry for that
    /// column only; the rest of the analysis stands.
    pub async fn analyze_table(&self, table: &str) -> Result<TableStats, DbError> {
        let mut conn = self.connect().await?;
        let result = self.collect_stats(&mut conn, table).await;
        let _ = conn.close().await;
        result
    }

    async fn collect_stats(
        &self,
        conn: &mut PgConnection,
        table: &str,
    ) -> Result<TableStats, DbError> {
        self.ensure_known_table(&mut *conn, table).await?;

        let total_rows = count_rows(&mut *conn, table).await?;
        let columns = fetch_json_rows(&mut *conn, NUMERIC_COLUMNS_QUERY, &[table]).await?;

        let mut numeric_columns_stats = Map::new();
        for column in &columns {
            let name = match column.get("column_name").and_then(|n| n.as_str()) {
                Some(name) => name,
                None => continue,
            };

            let entry = match column_stats(&mut *conn, table, name).await {
                Ok(stats) => stats,
                Err(err) => {
                    warn!(table, column = name, error = %err, "column statistics unavailable");
                    json!({"error": "unable to compute statistics"})
                }
            };
            numeric_columns_stats.insert(name.to_string(), entry);
        }

        Ok(TableStats {
            table_name: table.to_string(),
            basic_stats: json!({"total_rows": total_rows}),
            numeric_columns_stats,
        })
    }
}

/// One aggregate pass over a single column. Aggregates are cast to
/// `double precision` so integer, numeric and float columns all decode
/// the same way.
async fn column_stats(
    conn: &mut PgConnection,
    table: &str,
    column: &str,
) -> Result<Value, DbError> {
    let table_ident = quote_ident(table);
    let column_ident = quote_ident(column);
    let sql = format!(
        "SELECT \
            MIN({column_ident})::double precision AS min_value, \
            MAX({column_ident})::double precision AS max_value, \
            AVG({column_ident})::double precision AS avg_value, \
            COUNT({column_ident}) AS non_null_count, \
            COUNT(*) - COUNT({column_ident}) AS null_count \
        FROM {table_ident}"
    );

    let rows = sqlx::query(&sql)
        .fetch_all(conn)
        .await
        .map_err(DbError::Execution)?;

    Ok(rows.first().map(row_to_json).unwrap_or_else(|| json!({})))
}
