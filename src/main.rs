//! Todo chat service binary.

use std::sync::Arc;

use clap::Parser;
use todo_agent::cli::Cli;
use todo_agent::error::AgentError;
use todo_agent::server::{self, ServiceContext};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_agent=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!(error = %e, "service stopped");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AgentError> {
    let config = cli.load_config()?;
    info!(?config, "loaded configuration");

    let ctx = Arc::new(ServiceContext::from_config(&config));
    ctx.startup(&config).await?;

    let served = server::serve(Arc::clone(&ctx), config.bind_addr()).await;
    if let Err(e) = ctx.shutdown().await {
        warn!(error = %e, "tool server did not close cleanly");
    }
    info!("shutdown complete");
    served
}
