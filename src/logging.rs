//! Tracing subscriber setup for the binary.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` plus this crate at `info` and rmcp at `warn`.
pub fn env_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("jira_cloud_mcp=info".parse()?)
        .add_directive("rmcp=warn".parse()?))
}

/// Install the global subscriber. Logs go to stderr since stdio mode uses
/// stdout for the protocol.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter()?)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
