//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use paygate_types::TransactionStore;

use super::auth::{GatewayCredentials, gateway_auth_middleware, user_auth_middleware};
use super::handlers::{self, AppState};
use crate::PaymentService;

/// HTTP Server for the payment gateway broker.
pub struct HttpServer<S: TransactionStore> {
    state: Arc<AppState<S>>,
}

impl<S: TransactionStore> HttpServer<S> {
    /// Creates a new HTTP server with the given service and gateway credentials.
    pub fn new(service: PaymentService<S>, gateways: GatewayCredentials) -> Self {
        if gateways.is_empty() {
            tracing::warn!("No gateway API keys configured, every callback will be rejected");
        }
        Self {
            state: Arc::new(AppState { service, gateways }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let user_routes = Router::new()
            .route("/deposit", post(handlers::deposit::<S>))
            .route("/withdraw", post(handlers::withdraw::<S>))
            .route_layer(middleware::from_fn(user_auth_middleware));

        let gateway_routes = Router::new()
            .route("/payment-callback", post(handlers::payment_callback::<S>))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                gateway_auth_middleware::<S>,
            ));

        Router::new()
            .route("/health", get(handlers::health::<S>))
            .merge(user_routes)
            .merge(gateway_routes)
            .layer(metrics)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let router = self.router();
        drop(self);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
