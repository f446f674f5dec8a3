//! Per-call connection handling and read-only query execution.

use serde::Serialize;
use serde_json::{Map, Value, json};
use sqlx::postgres::PgRow;
use sqlx::{Column, Connection, PgConnection, Row};
use tracing::debug;

use easel_core::UpstreamConfig;

use crate::error::DbError;
use crate::guard;
use crate::introspect::quote_ident;

/// Row cap for caller-facing query results.
pub const MAX_ROWS: usize = 100;

/// Upper bound for `sample_rows` limits.
pub const MAX_SAMPLE_LIMIT: i64 = 100;

/// Read-only access to the configured database.
///
/// Every operation opens a dedicated connection and closes it before
/// returning; nothing is pooled or shared across calls.
#[derive(Debug, Clone)]
pub struct Database {
    config: UpstreamConfig,
}

/// Result envelope for `execute_readonly_query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub query: String,
    /// Full result size before the row cap is applied.
    pub row_count: usize,
    pub results: Vec<Value>,
    pub truncated: bool,
}

/// Result envelope for `get_sample_data`.
#[derive(Debug, Clone, Serialize)]
pub struct SampleData {
    pub table_name: String,
    pub sample_size: usize,
    pub requested_limit: i64,
    pub data: Vec<Value>,
}

impl Database {
    pub fn new(config: UpstreamConfig) -> Self {
        Self { config }
    }

    /// Connection target in `host:port/database` form, safe to log.
    pub fn describe_target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.config.host, self.config.port, self.config.database
        )
    }

    pub(crate) async fn connect(&self) -> Result<PgConnection, DbError> {
        let url = self.config.connection_string();
        PgConnection::connect(&url)
            .await
            .map_err(DbError::Connection)
    }

    /// Connectivity check. Returns the server version string.
    pub async fn ping(&self) -> Result<String, DbError> {
        let mut conn = self.connect().await?;
        let fetched = sqlx::query_scalar::<_, String>("SELECT version()")
            .fetch_one(&mut conn)
            .await;
        let _ = conn.close().await;
        fetched.map_err(DbError::Execution)
    }

    /// Run a guarded read-only query, capping results at [`MAX_ROWS`].
    ///
    /// `row_count` reflects the full result size; `truncated` signals that
    /// the cap dropped rows.
    pub async fn run_readonly(&self, sql: &str) -> Result<QueryResult, DbError> {
        guard::classify(sql)?;

        let mut conn = self.connect().await?;
        let fetched = sqlx::query(sql).fetch_all(&mut conn).await;
        let _ = conn.close().await;

        let rows = fetched.map_err(DbError::Execution)?;
        let row_count = rows.len();
        debug!(row_count, "read-only query returned");

        Ok(QueryResult {
            query: sql.to_string(),
            row_count,
            results: rows.iter().take(MAX_ROWS).map(row_to_json).collect(),
            truncated: row_count > MAX_ROWS,
        })
    }

    /// Fetch up to `limit` rows from a table. Limits above
    /// [`MAX_SAMPLE_LIMIT`] are clamped; the clamped value is echoed back
    /// as `requested_limit`.
    pub async fn sample_rows(&self, table: &str, limit: i64) -> Result<SampleData, DbError> {
        let limit = clamp_sample_limit(limit);

        let mut conn = self.connect().await?;
        let fetched = self.fetch_sample(&mut conn, table, limit).await;
        let _ = conn.close().await;

        let data = fetched?;
        Ok(SampleData {
            table_name: table.to_string(),
            sample_size: data.len(),
            requested_limit: limit,
            data,
        })
    }

    async fn fetch_sample(
        &self,
        conn: &mut PgConnection,
        table: &str,
        limit: i64,
    ) -> Result<Vec<Value>, DbError> {
        self.ensure_known_table(&mut *conn, table).await?;

        let sql = format!("SELECT * FROM {} LIMIT $1", quote_ident(table));
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(conn)
            .await
            .map_err(DbError::Execution)?;

        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn clamp_sample_limit(limit: i64) -> i64 {
    limit.min(MAX_SAMPLE_LIMIT)
}

/// Run a parameterized query and return each row as a JSON object.
pub(crate) async fn fetch_json_rows(
    conn: &mut PgConnection,
    sql: &str,
    binds: &[&str],
) -> Result<Vec<Value>, DbError> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = query.bind(bind.to_string());
    }

    let rows = query.fetch_all(conn).await.map_err(DbError::Execution)?;
    Ok(rows.iter().map(row_to_json).collect())
}

/// Convert a database row to an ordered JSON object.
///
/// Postgres decoding is type-strict, so the chain tries each concrete
/// type the tool surface can encounter and falls back to NULL for
/// anything it cannot decode (including actual NULLs).
pub(crate) fn row_to_json(row: &PgRow) -> Value {
    let mut obj = Map::new();

    for col in row.columns() {
        let name = col.name();

        let value: Value = if let Ok(v) = row.try_get::<i64, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<i32, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<i16, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<f64, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<f32, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<bool, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<String, _>(name) {
            json!(v)
        } else if let Ok(v) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
            json!(v.to_rfc3339())
        } else if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(name) {
            json!(v.to_string())
        } else if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(name) {
            json!(v.to_string())
        } else if let Ok(v) = row.try_get::<uuid::Uuid, _>(name) {
            json!(v.to_string())
        } else if let Ok(v) = row.try_get::<bigdecimal::BigDecimal, _>(name) {
            json!(v.to_string())
        } else if let Ok(v) = row.try_get::<Value, _>(name) {
            v
        } else {
            Value::Null
        };

        obj.insert(name.to_string(), value);
    }

    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_result_serializes_envelope_fields() {
        let result = QueryResult {
            query: "SELECT 1".to_string(),
            row_count: 150,
            results: vec![json!({"n": 1})],
            truncated: true,
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["query"], "SELECT 1");
        assert_eq!(value["row_count"], 150);
        assert_eq!(value["truncated"], true);
        assert_eq!(value["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn sample_data_serializes_envelope_fields() {
        let sample = SampleData {
            table_name: "users".to_string(),
            sample_size: 2,
            requested_limit: 10,
            data: vec![json!({"id": 1}), json!({"id": 2})],
        };

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["table_name"], "users");
        assert_eq!(value["sample_size"], 2);
        assert_eq!(value["requested_limit"], 10);
    }

    #[test]
    fn sample_limit_is_clamped_at_100() {
        assert_eq!(clamp_sample_limit(500), 100);
        assert_eq!(clamp_sample_limit(100), 100);
        assert_eq!(clamp_sample_limit(10), 10);
    }

    #[test]
    fn describe_target_omits_credentials() {
        let mut config = UpstreamConfig::default();
        config.host = "db.internal".to_string();
        config.port = 5433;
        config.database = "appdb".to_string();
        config.password = Some("hunter2".to_string());

        let db = Database::new(config);
        let target = db.describe_target();

        assert_eq!(target, "db.internal:5433/appdb");
        assert!(!target.contains("hunter2"));
    }
}
