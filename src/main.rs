use anyhow::{Context, Result};
use evolution_amqp::config::{self, CONFIG_FILE_NAME};
use evolution_amqp::{env, AmqpConnector};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // `evolution-amqp init-config [path]` writes a starter config file
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("init-config") {
        let path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        return config::create_default_config_file(&path);
    }

    let config = env::load().context("Failed to load configuration")?;
    if !config.rabbitmq.enabled {
        info!("RabbitMQ is disabled, nothing to do");
        return Ok(());
    }

    let mut connector = AmqpConnector::from_settings(config.amqp_settings())?;
    connector.initialize().await?;

    connector
        .init_queues(&config.server.name, &config.rabbitmq.events)
        .await?;

    info!("Service running. Press Ctrl+C to exit.");
    tokio::signal::ctrl_c().await?;

    if let Err(e) = connector.close().await {
        error!("Failed to close AMQP connection: {}", e);
    }

    Ok(())
}
