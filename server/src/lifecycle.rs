//! Application lifecycle and graceful shutdown.
//!
//! On SIGINT or SIGTERM:
//! 1. the HTTP server stops accepting connections and drains in-flight requests
//! 2. the shutdown broadcast reaches the notification consumer
//! 3. the consumer gets `SHUTDOWN_TIMEOUT` seconds to stop
//! 4. the database pool is closed

use crate::config::Config;
use crate::resources::Resources;
use boxoffice_runtime::{AdmissionController, EventCatalog, NotificationConsumer, metrics};
use boxoffice_web::{AppState, build_router};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Fully wired application, ready to run.
pub struct Application {
    listener: tokio::net::TcpListener,
    app: axum::Router,
    consumer: NotificationConsumer,
    shutdown_tx: broadcast::Sender<()>,
    resources: Resources,
    shutdown_timeout: Duration,
}

impl Application {
    /// Connect resources, wire the services and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns error if a backing service is unreachable, the metrics
    /// recorder cannot be installed or the address cannot be bound.
    pub async fn build(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let resources = Resources::from_config(config).await?;
        let store = resources.store.clone();

        let admission = AdmissionController::new(
            Arc::new(store.clone()),
            resources.event_bus.clone(),
            resources.clock.clone(),
        )
        .with_topic(config.redpanda.booking_topic.clone());

        let catalog = EventCatalog::new(Arc::new(store.clone()), resources.cache.clone())
            .with_ttl(Duration::from_secs(config.cache.ttl));

        let shared = Arc::new(store);
        let mut state = AppState::new(
            admission,
            catalog,
            shared.clone(),
            shared.clone(),
            shared.clone(),
        );
        if config.server.metrics_enabled {
            state = state.with_metrics(metrics::install_recorder()?);
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let consumer = NotificationConsumer::new(resources.event_bus.clone(), shared, shutdown_rx)
            .with_topic(config.redpanda.booking_topic.clone())
            .with_reconnect_delay(Duration::from_secs(config.notification.reconnect_delay))
            .with_failure_policy(config.notification.policy());

        let address = config.bind_address();
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!(address = %address, "Listener bound");

        Ok(Self {
            listener,
            app: build_router(state),
            consumer,
            shutdown_tx,
            resources,
            shutdown_timeout: Duration::from_secs(config.server.shutdown_timeout),
        })
    }

    /// Serve until a shutdown signal arrives, then stop everything in order.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let consumer = self.consumer.spawn();
        info!("Notification consumer started");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("HTTP server stopped, shutting down background tasks...");

        let _ = self.shutdown_tx.send(());
        match tokio::time::timeout(self.shutdown_timeout, consumer).await {
            Ok(Ok(())) => info!("Notification consumer stopped gracefully"),
            Ok(Err(e)) => warn!(error = %e, "Notification consumer task failed"),
            Err(_) => warn!(
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Notification consumer shutdown timed out"
            ),
        }

        self.resources.close().await;
        info!("Graceful shutdown complete");
        Ok(())
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
