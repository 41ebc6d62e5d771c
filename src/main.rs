use slirc_bot::client::Client;
use slirc_bot::config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        nick = %config.identity.nicknames.join(","),
        servers = %config.server.addresses.join(","),
        "Starting slirc-bot"
    );

    let mut client = Client::from_config(&config)?;

    tokio::select! {
        _ = client.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, quitting");
        }
    }

    if client.connection().connected() {
        client.quit(Some("shutting down")).await;
    }
    Ok(())
}
