// Run the demo gateway

use anyhow::{Context, Result};
use campus_gateway::routes::router;
use campus_gateway::GatewayState;
use campus_guards::GuardConfig;
use clap::Args;
use tokio::net::TcpListener;
use tracing::info;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: String,
}

pub async fn run(args: &ServeArgs, config: &GuardConfig) -> Result<()> {
    let state = GatewayState::from_config(config)?;
    let app = router(state);

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(
        addr = %listener.local_addr()?,
        branch_header = %config.branch_header_name,
        "campus guard gateway listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
