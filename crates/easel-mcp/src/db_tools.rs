//! Database tools backed by the read-only Postgres layer.
//!
//! The query guard and table allowlist live in `easel-pg`; these handlers
//! only shape arguments on the way in and flatten results or errors to
//! strings on the way out.

use std::sync::Arc;

use async_trait::async_trait;
use easel_pg::{Database, DbError, MAX_ROWS, MAX_SAMPLE_LIMIT};
use serde::Serialize;
use serde_json::{Value, json};

use crate::protocol::{RequestContext, ToolAnnotations, ToolDefinition};
use crate::tools::{ToolHandler, optional_i64, required_str};

const DEFAULT_SAMPLE_LIMIT: i64 = 10;

/// Map a database error onto the tool-result prefix vocabulary.
///
/// The inner sqlx error is used where the variant wrapper would repeat
/// the prefix wording.
pub(crate) fn db_error_string(err: &DbError) -> String {
    match err {
        DbError::Connection(e) => format!("Connection failed: {e}"),
        DbError::Execution(e) => format!("Query failed: {e}"),
        DbError::UnknownTable(_) => format!("Query failed: {err}"),
        DbError::Rejected(rejection) => format!("Query rejected: {rejection}"),
    }
}

pub(crate) fn render_pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("Query failed: could not serialize result: {e}"))
}

/// `execute_readonly_query`: guarded ad-hoc SELECT/WITH execution.
pub struct ExecuteReadonlyQueryTool {
    db: Arc<Database>,
}

impl ExecuteReadonlyQueryTool {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ToolHandler for ExecuteReadonlyQueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "execute_readonly_query".to_string(),
            description: Some(format!(
                "Execute a read-only SQL query (SELECT or WITH) against the \
                 connected PostgreSQL database. Returns up to {MAX_ROWS} rows \
                 as JSON together with the full row count."
            )),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "SQL query to execute; must start with SELECT or WITH"
                    }
                },
                "required": ["sql"]
            }),
            annotations: Some(ToolAnnotations {
                title: Some("Execute Read-Only Query".to_string()),
                read_only_hint: Some(true),
            }),
        }
    }

    async fn call(&self, arguments: &Value, _context: &RequestContext) -> String {
        let sql = match required_str(arguments, "sql") {
            Ok(s) => s,
            Err(msg) => return msg,
        };

        match self.db.run_readonly(sql).await {
            Ok(result) => render_pretty(&result),
            Err(err) => db_error_string(&err),
        }
    }
}

/// `get_sample_data`: first rows of a table, capped.
pub struct GetSampleDataTool {
    db: Arc<Database>,
}

impl GetSampleDataTool {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ToolHandler for GetSampleDataTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_sample_data".to_string(),
            description: Some(format!(
                "Fetch sample rows from a table to inspect its contents. The \
                 row limit is capped at {MAX_SAMPLE_LIMIT}."
            )),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to sample"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of rows to fetch",
                        "default": DEFAULT_SAMPLE_LIMIT
                    }
                },
                "required": ["table_name"]
            }),
            annotations: Some(ToolAnnotations {
                title: Some("Get Sample Data".to_string()),
                read_only_hint: Some(true),
            }),
        }
    }

    async fn call(&self, arguments: &Value, _context: &RequestContext) -> String {
        let table = match required_str(arguments, "table_name") {
            Ok(t) => t,
            Err(msg) => return msg,
        };
        let limit = optional_i64(arguments, "limit").unwrap_or(DEFAULT_SAMPLE_LIMIT);

        match self.db.sample_rows(table, limit).await {
            Ok(sample) => render_pretty(&sample),
            Err(err) => db_error_string(&err),
        }
    }
}

/// `analyze_table_stats`: row count plus per-numeric-column summaries.
pub struct AnalyzeTableStatsTool {
    db: Arc<Database>,
}

impl AnalyzeTableStatsTool {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ToolHandler for AnalyzeTableStatsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "analyze_table_stats".to_string(),
            description: Some(
                "Analyze a table: total row count plus min/max/average and null \
                 counts for every numeric column."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to analyze"
                    }
                },
                "required": ["table_name"]
            }),
            annotations: Some(ToolAnnotations {
                title: Some("Analyze Table Stats".to_string()),
                read_only_hint: Some(true),
            }),
        }
    }

    async fn call(&self, arguments: &Value, _context: &RequestContext) -> String {
        let table = match required_str(arguments, "table_name") {
            Ok(t) => t,
            Err(msg) => return msg,
        };

        match self.db.analyze_table(table).await {
            Ok(stats) => render_pretty(&stats),
            Err(err) => db_error_string(&err),
        }
    }
}
