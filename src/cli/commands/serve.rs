//! The `serve` subcommand.

use anyhow::Result;
use clap::Args;

use super::CommandContext;

/// Arguments for serve command
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind, overriding `server.bind_to`
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    /// Run the HTTP API until interrupted.
    #[cfg(feature = "api")]
    pub async fn execute(self, ctx: &CommandContext) -> Result<i32> {
        use anyhow::Context;
        use bmc_actor::api::{ApiServer, AppState};
        use bmc_actor::engine::Engine;
        use std::net::SocketAddr;
        use tracing::info;

        let bind = self
            .bind
            .unwrap_or_else(|| ctx.config.server.bind_to.clone());
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("Invalid bind address: {bind}"))?;

        let engine = Engine::from_config(&ctx.config, ctx.connector.clone())?;
        let state = AppState::new(
            engine,
            ctx.config.screenshot.storage.clone(),
            ctx.config.screenshot.url_prefix.clone(),
        );

        ApiServer::new(addr, state)
            .run_with_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutting down");
                }
            })
            .await?;
        Ok(0)
    }

    /// The HTTP API is not compiled in.
    #[cfg(not(feature = "api"))]
    pub async fn execute(self, _ctx: &CommandContext) -> Result<i32> {
        anyhow::bail!("bmc-actor was built without the `api` feature")
    }
}
