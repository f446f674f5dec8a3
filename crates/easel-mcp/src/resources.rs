//! Schema resources and the resource registry.
//!
//! Two flavors: fixed-URI resources (`schema://tables`) and templated
//! resources (`schema://table/{table_name}`), resolved by a prefix/suffix
//! match on the URI. Reads follow the tool convention: the payload is a
//! serialized JSON document on success, a prefix-labeled diagnostic on
//! failure.

use std::sync::Arc;

use async_trait::async_trait;
use easel_pg::Database;

use crate::db_tools::{db_error_string, render_pretty};
use crate::protocol::{ResourceDefinition, ResourceTemplate};

/// A fixed-URI resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn definition(&self) -> ResourceDefinition;

    async fn read(&self) -> String;
}

/// A templated resource with a single `{parameter}` in its URI.
#[async_trait]
pub trait TemplateHandler: Send + Sync {
    fn template(&self) -> ResourceTemplate;

    async fn read(&self, param: &str) -> String;
}

/// Registry of fixed and templated resources, in registration order.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    resources: Vec<Arc<dyn ResourceHandler>>,
    templates: Vec<Arc<dyn TemplateHandler>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, handler: Arc<dyn ResourceHandler>) {
        let uri = handler.definition().uri;
        self.resources.retain(|r| r.definition().uri != uri);
        self.resources.push(handler);
    }

    pub fn register_template(&mut self, handler: Arc<dyn TemplateHandler>) {
        let uri = handler.template().uri_template;
        self.templates.retain(|t| t.template().uri_template != uri);
        self.templates.push(handler);
    }

    /// Fixed resources advertised by `resources/list`.
    pub fn definitions(&self) -> Vec<ResourceDefinition> {
        self.resources.iter().map(|r| r.definition()).collect()
    }

    /// Templates advertised by `resources/templates/list`.
    pub fn templates(&self) -> Vec<ResourceTemplate> {
        self.templates.iter().map(|t| t.template()).collect()
    }

    /// Resolve a URI against fixed resources first, then templates.
    /// `None` means nothing matched.
    pub async fn read(&self, uri: &str) -> Option<String> {
        if let Some(resource) = self.resources.iter().find(|r| r.definition().uri == uri) {
            return Some(resource.read().await);
        }
        for template in &self.templates {
            if let Some(param) = match_template(&template.template().uri_template, uri) {
                return Some(template.read(&param).await);
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.templates.is_empty()
    }
}

/// Extract the single parameter of a `prefix{name}suffix` template from a
/// concrete URI. The parameter must be non-empty and must not span path
/// segments.
pub fn match_template(template: &str, uri: &str) -> Option<String> {
    let open = template.find('{')?;
    let close = template.find('}')?;
    if close < open {
        return None;
    }
    let prefix = &template[..open];
    let suffix = &template[close + 1..];
    if uri.len() <= prefix.len() + suffix.len() {
        return None;
    }
    let param = uri.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if param.is_empty() || param.contains('/') {
        return None;
    }
    Some(param.to_string())
}

/// `schema://tables`: the user tables of the connected database.
pub struct TablesResource {
    db: Arc<Database>,
}

impl TablesResource {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResourceHandler for TablesResource {
    fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri: "schema://tables".to_string(),
            name: "Database Tables".to_string(),
            description: Some("List of all user tables in the database".to_string()),
            mime_type: Some("application/json".to_string()),
        }
    }

    async fn read(&self) -> String {
        match self.db.list_tables().await {
            Ok(summary) => render_pretty(&summary),
            Err(err) => db_error_string(&err),
        }
    }
}

/// `schema://table/{table_name}`: columns, constraints and row count.
pub struct TableReportTemplate {
    db: Arc<Database>,
}

impl TableReportTemplate {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateHandler for TableReportTemplate {
    fn template(&self) -> ResourceTemplate {
        ResourceTemplate {
            uri_template: "schema://table/{table_name}".to_string(),
            name: "Table Schema".to_string(),
            description: Some(
                "Columns, constraints and row count for a specific table".to_string(),
            ),
            mime_type: Some("application/json".to_string()),
        }
    }

    async fn read(&self, param: &str) -> String {
        match self.db.table_report(param).await {
            Ok(report) => render_pretty(&report),
            Err(err) => db_error_string(&err),
        }
    }
}

/// `schema://indexes/{table_name}`: index definitions for a table.
pub struct IndexesTemplate {
    db: Arc<Database>,
}

impl IndexesTemplate {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateHandler for IndexesTemplate {
    fn template(&self) -> ResourceTemplate {
        ResourceTemplate {
            uri_template: "schema://indexes/{table_name}".to_string(),
            name: "Table Indexes".to_string(),
            description: Some("Index definitions for a specific table".to_string()),
            mime_type: Some("application/json".to_string()),
        }
    }

    async fn read(&self, param: &str) -> String {
        match self.db.table_indexes(param).await {
            Ok(report) => render_pretty(&report),
            Err(err) => db_error_string(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResource;

    #[async_trait]
    impl ResourceHandler for FixedResource {
        fn definition(&self) -> ResourceDefinition {
            ResourceDefinition {
                uri: "schema://tables".to_string(),
                name: "tables".to_string(),
                description: None,
                mime_type: Some("application/json".to_string()),
            }
        }

        async fn read(&self) -> String {
            "{\"tables\": []}".to_string()
        }
    }

    struct EchoTemplate;

    #[async_trait]
    impl TemplateHandler for EchoTemplate {
        fn template(&self) -> ResourceTemplate {
            ResourceTemplate {
                uri_template: "schema://table/{table_name}".to_string(),
                name: "table".to_string(),
                description: None,
                mime_type: Some("application/json".to_string()),
            }
        }

        async fn read(&self, param: &str) -> String {
            format!("table={param}")
        }
    }

    #[test]
    fn template_extracts_parameter() {
        assert_eq!(
            match_template("schema://table/{table_name}", "schema://table/orders"),
            Some("orders".to_string())
        );
    }

    #[test]
    fn template_rejects_multi_segment_parameter() {
        assert_eq!(
            match_template("schema://table/{table_name}", "schema://table/a/b"),
            None
        );
    }

    #[test]
    fn template_rejects_empty_parameter() {
        assert_eq!(
            match_template("schema://table/{table_name}", "schema://table/"),
            None
        );
    }

    #[test]
    fn template_rejects_unrelated_uri() {
        assert_eq!(
            match_template("schema://table/{table_name}", "schema://indexes/orders"),
            None
        );
    }

    #[tokio::test]
    async fn read_prefers_exact_resource_then_templates() {
        let mut registry = ResourceRegistry::new();
        registry.register_resource(Arc::new(FixedResource));
        registry.register_template(Arc::new(EchoTemplate));

        assert_eq!(
            registry.read("schema://tables").await,
            Some("{\"tables\": []}".to_string())
        );
        assert_eq!(
            registry.read("schema://table/orders").await,
            Some("table=orders".to_string())
        );
        assert_eq!(registry.read("schema://nothing").await, None);
    }

    #[test]
    fn listings_are_split_by_kind() {
        let mut registry = ResourceRegistry::new();
        registry.register_resource(Arc::new(FixedResource));
        registry.register_template(Arc::new(EchoTemplate));

        assert_eq!(registry.definitions().len(), 1);
        assert_eq!(registry.templates().len(), 1);
    }
}
