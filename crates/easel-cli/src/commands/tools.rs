//! Tools command implementation.
//!
//! Lists the MCP surface the server would expose, without starting a
//! transport or touching the network.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use easel_core::EaselConfig;
use easel_pg::Database;

use super::serve::build_registries;

/// Arguments for `easel tools`.
#[derive(Debug, Args)]
pub struct ToolsArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "easel.yaml")]
    pub config: PathBuf,

    /// Show detailed input schemas and prompt arguments.
    #[arg(long)]
    pub verbose: bool,
}

/// Execute the tools command.
pub async fn execute(args: ToolsArgs) -> Result<()> {
    let config = EaselConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    let db = Arc::new(Database::new(config.upstream.clone()));
    let (tools, resources, prompts) = build_registries(&config, db)?;

    let definitions = tools.definitions();
    println!("\n🔧 Tools ({}):", definitions.len());
    for tool in &definitions {
        let read_only = tool
            .annotations
            .as_ref()
            .is_some_and(|a| a.read_only_hint == Some(true));
        let badge = if read_only { "read" } else { "write" };

        println!("   • {} ({})", tool.name, badge);
        if let Some(desc) = &tool.description {
            println!("     {}", desc);
        }
        if args.verbose {
            println!(
                "     Schema: {}",
                serde_json::to_string_pretty(&tool.input_schema)?
            );
        }
    }

    let fixed = resources.definitions();
    let templates = resources.templates();
    println!("\n📚 Resources ({} + {} templates):", fixed.len(), templates.len());
    for resource in &fixed {
        println!("   • {} ({})", resource.uri, resource.name);
    }
    for template in &templates {
        println!("   • {} ({})", template.uri_template, template.name);
    }

    let prompt_list = prompts.definitions();
    println!("\n💬 Prompts ({}):", prompt_list.len());
    for prompt in &prompt_list {
        println!("   • {}", prompt.name);
        if let Some(desc) = &prompt.description {
            println!("     {}", desc);
        }
        if args.verbose {
            for arg in &prompt.arguments {
                let required = if arg.required { "required" } else { "optional" };
                println!("     - {} ({})", arg.name, required);
            }
        }
    }

    println!();

    Ok(())
}
