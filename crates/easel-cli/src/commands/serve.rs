//! Serve command implementation.
//!
//! Assembles the tool, resource and prompt registries and runs the MCP
//! server over the selected transport.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use easel_core::{EaselConfig, Transport};
use easel_dashscope::{CredentialResolver, DashScopeClient};
use easel_mcp::db_tools::{AnalyzeTableStatsTool, ExecuteReadonlyQueryTool, GetSampleDataTool};
use easel_mcp::image_tools::{GenerateImageTool, GetImageGenerationResultTool, ImageEditTool};
use easel_mcp::prompts::{
    BusinessInsightsPrompt, DataExplorationPrompt, DataQualityReportPrompt,
    PerformanceAnalysisPrompt,
};
use easel_mcp::resources::{IndexesTemplate, TableReportTemplate, TablesResource};
use easel_mcp::{McpServer, PromptRegistry, ResourceRegistry, ToolRegistry};
use easel_pg::Database;

/// Arguments for `easel serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "easel.yaml")]
    pub config: PathBuf,

    /// Transport type (stdio or http). Overrides the config file.
    #[arg(long)]
    pub transport: Option<String>,

    /// HTTP bind host. Overrides the config file.
    #[arg(long)]
    pub host: Option<String>,

    /// HTTP port. Overrides the config file.
    #[arg(long)]
    pub port: Option<u16>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs) -> Result<()> {
    if !args.config.exists() {
        warn!(config = %args.config.display(), "config file not found, using defaults");
    }
    let mut config = EaselConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut config, &args)?;

    info!(
        transport = ?config.mcp.transport,
        addr = %config.mcp.bind_addr(),
        "starting easel MCP server"
    );

    // Probe the upstream database once at startup. A failure is not fatal:
    // the image tools work without it, and each database tool opens its own
    // connection anyway.
    let db = Arc::new(Database::new(config.upstream.clone()));
    match db.ping().await {
        Ok(version) => {
            info!(target = %db.describe_target(), %version, "connected to upstream database");
        }
        Err(e) => {
            warn!(
                target = %db.describe_target(),
                error = %e,
                "upstream database not reachable, database tools will fail until it is"
            );
        }
    }

    let (tools, resources, prompts) = build_registries(&config, db)?;
    info!(tool_count = tools.len(), "registries assembled");

    let transport = config.mcp.transport.clone();
    let server = McpServer::new(config.mcp)
        .with_tools(tools)
        .with_resources(resources)
        .with_prompts(prompts);

    match transport {
        Transport::Stdio => server.run().await?,
        Transport::Http => {
            tokio::select! {
                result = server.run() => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("received Ctrl-C, shutting down");
                }
            }
        }
    }

    Ok(())
}

/// Apply CLI flags on top of the loaded configuration.
fn apply_overrides(config: &mut EaselConfig, args: &ServeArgs) -> Result<()> {
    if let Some(transport) = args.transport.as_deref() {
        config.mcp.transport = match transport {
            "stdio" => Transport::Stdio,
            "http" => Transport::Http,
            other => anyhow::bail!("Unknown transport: {}. Use 'stdio' or 'http'", other),
        };
    }
    if let Some(host) = &args.host {
        config.mcp.host = host.clone();
    }
    if let Some(port) = args.port {
        config.mcp.port = port;
    }
    Ok(())
}

/// Build the tool, resource and prompt registries.
///
/// The DashScope credential policy follows the transport: stdio servers
/// read the API key from the environment only, HTTP servers also accept a
/// per-request Authorization header.
pub(crate) fn build_registries(
    config: &EaselConfig,
    db: Arc<Database>,
) -> Result<(ToolRegistry, ResourceRegistry, PromptRegistry)> {
    let client = Arc::new(
        DashScopeClient::new(&config.dashscope).context("failed to build DashScope client")?,
    );
    let resolver = if config.mcp.is_http() {
        CredentialResolver::hosted(config.dashscope.api_key_env.clone())
    } else {
        CredentialResolver::local(config.dashscope.api_key_env.clone())
    };

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(GenerateImageTool::new(
        client.clone(),
        resolver.clone(),
    )));
    tools.register(Arc::new(GetImageGenerationResultTool::new(
        client.clone(),
        resolver.clone(),
    )));
    tools.register(Arc::new(ImageEditTool::new(client, resolver)));
    tools.register(Arc::new(ExecuteReadonlyQueryTool::new(db.clone())));
    tools.register(Arc::new(GetSampleDataTool::new(db.clone())));
    tools.register(Arc::new(AnalyzeTableStatsTool::new(db.clone())));

    let mut resources = ResourceRegistry::new();
    resources.register_resource(Arc::new(TablesResource::new(db.clone())));
    resources.register_template(Arc::new(TableReportTemplate::new(db.clone())));
    resources.register_template(Arc::new(IndexesTemplate::new(db)));

    let mut prompts = PromptRegistry::new();
    prompts.register(Arc::new(DataExplorationPrompt));
    prompts.register(Arc::new(PerformanceAnalysisPrompt));
    prompts.register(Arc::new(BusinessInsightsPrompt));
    prompts.register(Arc::new(DataQualityReportPrompt));

    Ok((tools, resources, prompts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with(transport: Option<&str>, port: Option<u16>) -> ServeArgs {
        ServeArgs {
            config: PathBuf::from("easel.yaml"),
            transport: transport.map(str::to_string),
            host: None,
            port,
        }
    }

    #[test]
    fn cli_flags_override_defaults() {
        let mut config = EaselConfig::default();
        apply_overrides(&mut config, &args_with(Some("http"), Some(8080))).unwrap();
        assert!(config.mcp.is_http());
        assert_eq!(config.mcp.port, 8080);
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let mut config = EaselConfig::default();
        config.mcp.port = 4000;
        apply_overrides(&mut config, &args_with(None, None)).unwrap();
        assert!(config.mcp.is_stdio());
        assert_eq!(config.mcp.port, 4000);
    }

    #[test]
    fn unknown_transport_is_an_error() {
        let mut config = EaselConfig::default();
        let err = apply_overrides(&mut config, &args_with(Some("websocket"), None)).unwrap_err();
        assert!(err.to_string().contains("Unknown transport: websocket"));
    }

    #[test]
    fn config_file_and_flags_compose() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("easel.yaml");
        std::fs::write(&path, "mcp:\n  transport: http\n  port: 4000\n").unwrap();

        let mut config = EaselConfig::load(&path).unwrap();
        assert_eq!(config.mcp.port, 4000);

        apply_overrides(&mut config, &args_with(None, Some(5000))).unwrap();
        assert!(config.mcp.is_http());
        assert_eq!(config.mcp.port, 5000);
    }

    #[test]
    fn registries_cover_every_surface() {
        let config = EaselConfig::default();
        let db = Arc::new(Database::new(config.upstream.clone()));
        let (tools, resources, prompts) = build_registries(&config, db).unwrap();

        assert_eq!(
            tools.names(),
            vec![
                "generate_image",
                "get_image_generation_result",
                "image_edit_generation",
                "execute_readonly_query",
                "get_sample_data",
                "analyze_table_stats",
            ]
        );
        assert_eq!(resources.definitions().len(), 1);
        assert_eq!(resources.templates().len(), 2);
        assert_eq!(prompts.definitions().len(), 4);
    }
}
