//! Booking service HTTP server.

use boxoffice_server::{Application, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxoffice=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting boxoffice booking service");

    let config = Config::from_env();
    info!(
        redpanda_brokers = %config.redpanda.brokers,
        booking_topic = %config.redpanda.booking_topic,
        port = config.server.port,
        metrics_enabled = config.server.metrics_enabled,
        "Configuration loaded"
    );

    Application::build(&config).await?.run().await
}
