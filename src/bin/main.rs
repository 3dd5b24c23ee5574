use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use jira_cloud_mcp::{create_server, load_server_config};

// rmcp imports for MCP stdio server mode
use rmcp::service::ServiceExt;
use rmcp::transport::stdio;

#[derive(Parser)]
#[command(name = "jira-cloud-mcp")]
#[command(about = "MCP server for Jira Cloud with per-request OAuth credentials")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as an MCP stdio server (for use in mcp.json)
    McpStdio {
        /// Path to a JSON config file (falls back to JIRA_MCP_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run as an MCP HTTP server
    McpHttp {
        /// Bind address, e.g. 0.0.0.0:8081
        #[arg(long, default_value = "0.0.0.0:3942")]
        bind: String,
        /// Path to a JSON config file (falls back to JIRA_MCP_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate configuration and print the effective settings
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    jira_cloud_mcp::logging::init()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::McpStdio { config } => {
            info!("Starting MCP stdio server (rmcp)");

            let config = load_server_config(config)?;
            if config.auth.default_access_token.is_none() {
                tracing::warn!(
                    "No default access token configured; set JIRA_ACCESS_TOKEN for stdio mode"
                );
            }

            let server = create_server(&config)?;

            // Run as an MCP stdio server. McpServer implements ServerHandler.
            let service = server
                .as_ref()
                .clone()
                .serve(stdio())
                .await
                .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

            // Block until the MCP session ends.
            service.waiting().await?;
            info!("MCP stdio server session ended");
        }
        Commands::McpHttp { bind, config } => {
            info!("Starting MCP HTTP server (rmcp) on {}", bind);

            let config = load_server_config(config)?;
            if config.auth.default_access_token.is_some() {
                tracing::warn!(
                    "Default access token is configured but ignored for HTTP requests; \
                     callers must send their own bearer token"
                );
            }
            let server = create_server(&config)?;

            jira_cloud_mcp::server::start_mcp_http(server, &bind).await?;
        }
        Commands::CheckConfig { config } => {
            let config = load_server_config(config)?;

            println!("Configuration OK");
            println!();
            println!("  Accessible resources: {}", config.accessible_resources_url);
            println!("  API base:             {}", config.api_base_url);
            println!("  Cloud ID header:      {}", config.auth.cloud_id_header);
            println!(
                "  Site cache TTL:       {}s",
                config.auth.site_cache_ttl_seconds
            );
            println!(
                "  Resources cache TTL:  {}s",
                config.auth.resources_cache_ttl_seconds
            );
            println!("  Cache max entries:    {}", config.auth.cache_max_entries);
            println!(
                "  Default token:        {}",
                if config.auth.default_access_token.is_some() {
                    "set"
                } else {
                    "not set"
                }
            );
        }
    }

    Ok(())
}
