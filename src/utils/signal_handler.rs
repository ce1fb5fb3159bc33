use anyhow::Result;
use tokio::signal;
use tracing::info;

/// Resolves once the process receives Ctrl-C.
pub async fn handle_ctrl_c() -> Result<()> {
    signal::ctrl_c().await?;
    info!("Received stop signal");

    Ok(())
}
