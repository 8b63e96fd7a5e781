//! Serve command - run the JSON read API until Ctrl-C

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::server::ApiServer;

#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Listen address; defaults to `server.bind` from the configuration
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let bind = self.bind.as_deref().unwrap_or(&ctx.config.server.bind);
        let server = ApiServer::new(Arc::new(ctx.library_cache()), bind)?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal(signal_token).await;
        });

        ctx.formatter()
            .success(&format!("Serving on http://{bind} (Ctrl-C to stop)"));
        server.run(shutdown).await
    }
}

/// Cancel `token` on Ctrl-C
async fn shutdown_signal(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT (Ctrl+C)"),
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
    }
    token.cancel();
}
