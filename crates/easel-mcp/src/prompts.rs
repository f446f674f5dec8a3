//! Analysis prompt templates and the prompt registry.
//!
//! Prompts render synchronously from their arguments; each produces a
//! single user message that steers a client toward the schema resources
//! and database tools exposed by this server.

use std::sync::Arc;

use serde_json::Value;

use crate::protocol::{
    GetPromptResult, PromptArgument, PromptDefinition, PromptMessage, ToolContent,
};
use crate::tools::{optional_str, required_str};

/// A named prompt template.
pub trait PromptHandler: Send + Sync {
    fn definition(&self) -> PromptDefinition;

    /// Render the prompt. `Err` carries an invalid-arguments message that
    /// the dispatch layer reports as a JSON-RPC error.
    fn render(&self, arguments: &Value) -> Result<GetPromptResult, String>;
}

/// Registry of prompts in registration order.
#[derive(Clone, Default)]
pub struct PromptRegistry {
    prompts: Vec<Arc<dyn PromptHandler>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn PromptHandler>) {
        let name = handler.definition().name;
        self.prompts.retain(|p| p.definition().name != name);
        self.prompts.push(handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PromptHandler>> {
        self.prompts.iter().find(|p| p.definition().name == name)
    }

    pub fn definitions(&self) -> Vec<PromptDefinition> {
        self.prompts.iter().map(|p| p.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

fn table_name_argument() -> PromptArgument {
    PromptArgument {
        name: "table_name".to_string(),
        description: Some("Name of the table to analyze".to_string()),
        required: true,
    }
}

fn user_message(description: &str, text: String) -> GetPromptResult {
    GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage {
            role: "user".to_string(),
            content: ToolContent::Text { text },
        }],
    }
}

/// Guided first-pass exploration of a table.
pub struct DataExplorationPrompt;

impl PromptHandler for DataExplorationPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "data_exploration_prompt".to_string(),
            description: Some("Structured data exploration of a table".to_string()),
            arguments: vec![table_name_argument()],
        }
    }

    fn render(&self, arguments: &Value) -> Result<GetPromptResult, String> {
        let table = required_str(arguments, "table_name")?;
        let text = format!(
            "As a data analyst, please help me explore the data in table '{table}'.\n\
             \n\
             Work through the following steps:\n\
             \n\
             1. **Table structure**\n\
                - Review the schema and the data type of every column\n\
                - Identify primary and foreign key constraints\n\
                - Check the index configuration\n\
             \n\
             2. **Data quality checks**\n\
                - Check the total and distinct row counts\n\
                - Look for duplicated records\n\
                - Inspect null counts per column\n\
                - Summarize numeric columns (minimum, maximum, average)\n\
             \n\
             3. **Sample preview**\n\
                - Fetch the first 10 rows to understand the data format\n\
                - Flag outliers or inconsistent values\n\
             \n\
             4. **Recommendations**\n\
                - Suggest follow-up analyses based on what the data shows\n\
                - Call out potential data quality problems\n\
                - Propose promising angles for deeper analysis\n\
             \n\
             Use the available tools to gather whatever information you need."
        );
        Ok(user_message("Structured data exploration", text))
    }
}

/// Index and query-pattern review for a table.
pub struct PerformanceAnalysisPrompt;

impl PromptHandler for PerformanceAnalysisPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "performance_analysis_prompt".to_string(),
            description: Some("Performance tuning opportunities for a table".to_string()),
            arguments: vec![table_name_argument()],
        }
    }

    fn render(&self, arguments: &Value) -> Result<GetPromptResult, String> {
        let table = required_str(arguments, "table_name")?;
        let text = format!(
            "As a database performance expert, please review table '{table}' for \
             optimization opportunities.\n\
             \n\
             Focus on:\n\
             \n\
             1. **Size and growth**\n\
                - Current row count\n\
                - Storage footprint of the table\n\
             \n\
             2. **Index review**\n\
                - Existing index configuration\n\
                - Missing index opportunities\n\
                - Redundant or unused indexes\n\
             \n\
             3. **Query patterns**\n\
                - Likely query shapes inferred from the table structure\n\
                - Probable performance bottlenecks\n\
             \n\
             4. **Recommendations**\n\
                - Index changes\n\
                - Query rewrites\n\
                - Table structure adjustments\n\
             \n\
             Use the available tools to collect the relevant details and make \
             concrete recommendations."
        );
        Ok(user_message("Performance tuning review", text))
    }
}

/// Business-level reading of a table, with an optional supplied context.
pub struct BusinessInsightsPrompt;

impl PromptHandler for BusinessInsightsPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "business_insights_prompt".to_string(),
            description: Some("Business insight mining from a table".to_string()),
            arguments: vec![
                table_name_argument(),
                PromptArgument {
                    name: "business_context".to_string(),
                    description: Some(
                        "Business background for the table; inferred from the data when omitted"
                            .to_string(),
                    ),
                    required: false,
                },
            ],
        }
    }

    fn render(&self, arguments: &Value) -> Result<GetPromptResult, String> {
        let table = required_str(arguments, "table_name")?;
        let context = optional_str(arguments, "business_context")
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                "infer the business scenario from the table structure and its data".to_string()
            });
        let text = format!(
            "As a business analyst, please help me mine business insights from \
             table '{table}'.\n\
             \n\
             Business context: {context}\n\
             \n\
             Goals:\n\
             \n\
             1. **Business understanding**\n\
                - Read the business scenario out of the structure and column names\n\
                - Identify the key business metrics\n\
             \n\
             2. **Trend analysis**\n\
                - If there are time columns, analyze trends over time\n\
                - Look for periodic patterns\n\
             \n\
             3. **Distribution analysis**\n\
                - Analyze how data is distributed across key dimensions\n\
                - Identify outliers and special cases\n\
             \n\
             4. **Correlation analysis**\n\
                - Look for relationships between columns\n\
                - Identify implied business rules and constraints\n\
             \n\
             5. **Actionable recommendations**\n\
                - Propose business improvements grounded in the data\n\
                - Point out data that would be worth collecting\n\
             \n\
             Use the available tools to pull the data and back every insight \
             with evidence."
        );
        Ok(user_message("Business insight mining", text))
    }
}

/// Full data quality report for a table.
pub struct DataQualityReportPrompt;

impl PromptHandler for DataQualityReportPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "data_quality_report_prompt".to_string(),
            description: Some("Detailed data quality report for a table".to_string()),
            arguments: vec![table_name_argument()],
        }
    }

    fn render(&self, arguments: &Value) -> Result<GetPromptResult, String> {
        let table = required_str(arguments, "table_name")?;
        let text = format!(
            "Please produce a detailed data quality report for table '{table}'.\n\
             \n\
             The report should cover:\n\
             \n\
             ## 1. Completeness\n\
             - Null analysis: count and share of nulls per column\n\
             - Required fields: completeness of key business columns\n\
             - Referential integrity: whether foreign key constraints hold\n\
             \n\
             ## 2. Consistency\n\
             - Duplicate detection\n\
             - Format consistency\n\
             - Plausibility of numeric ranges\n\
             \n\
             ## 3. Accuracy\n\
             - Outlier detection\n\
             - Data type fit\n\
             - Business rule violations\n\
             \n\
             ## 4. Timeliness\n\
             - If there are timestamp columns, check the update cadence\n\
             - Data freshness\n\
             \n\
             ## 5. Remediation\n\
             - Priority ranking of the problems found\n\
             - Concrete cleanup steps\n\
             - Preventive measures\n\
             \n\
             Use the available tools to collect the data behind each section."
        );
        Ok(user_message("Data quality report", text))
    }
}
