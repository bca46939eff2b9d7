use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use picross_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if config.auth.ephemeral_secret {
        warn!("╔══════════════════════════════════════════════════╗");
        warn!("║  PICROSS SERVER — DEV MODE                       ║");
        warn!("║  No JWT_SECRET_KEY. Using a throwaway secret.    ║");
        warn!("╚══════════════════════════════════════════════════╝");
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let (app, _state) = picross_server::build_app(config)
        .await
        .context("failed to set up database")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
