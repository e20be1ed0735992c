//! # Paygate Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize tracing (and OTLP export when configured)
//! - Build the store, gateway directory and gateway registry
//! - Start the event publisher and the payment service
//! - Serve HTTP until shutdown, then drain queued events

mod config;

use std::sync::Arc;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paygate_hex::inbound::{GatewayCredentials, HttpServer};
use paygate_hex::{DirectorySelector, EventPublisher, GatewayRegistry, PaymentService};
use paygate_repo::{
    ApproveAllCompliance, FixedBalance, HttpEventBus, LogEventBus, SimulatedGateway, build_repo,
};
use paygate_types::EventBus;

/// How long queued events may take to flush after the server stops.
const EVENT_DRAIN_GRACE: Duration = Duration::from_secs(5);

fn init_tracer(endpoint: &str) -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("paygate-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    // OpenTelemetry export is opt-in
    let otel = config
        .otlp_endpoint
        .as_deref()
        .map(init_tracer)
        .transpose()?;
    let (telemetry, otel_provider) = match otel {
        Some((tracer, provider)) => (
            Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Some(provider),
        ),
        None => (None, None),
    };

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paygate_app=debug,paygate_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!("Starting paygate server on port {}", config.port);

    // Build repository (handles connection and migration)
    let repo = build_repo(config.database_url.as_deref()).await?;
    tracing::info!("Using {} store", repo.backend());

    // Gateways
    let latency = config.simulated_gateway_latency;
    let registry = GatewayRegistry::new(Arc::new(SimulatedGateway::stripe().with_latency(latency)))
        .register(Arc::new(SimulatedGateway::paypal().with_latency(latency)));
    let selector = DirectorySelector::new(Arc::new(repo.clone()), registry);

    // Event bus
    let bus: Arc<dyn EventBus> = match &config.event_webhook_url {
        Some(url) => {
            tracing::info!("Publishing transaction events to {}", url);
            Arc::new(HttpEventBus::with_timeout(
                url.clone(),
                config.event_signing_secret.clone(),
                config.event_publish_timeout,
            )?)
        }
        None => {
            tracing::info!("No EVENT_WEBHOOK_URL set; transaction events go to the log");
            Arc::new(LogEventBus)
        }
    };
    let (publisher, mut workers) = EventPublisher::start(bus, config.publisher);

    // Create the payment service
    let service = PaymentService::new(
        repo,
        Arc::new(ApproveAllCompliance),
        Arc::new(FixedBalance::new(config.simulated_balance)),
        Arc::new(selector),
        publisher,
    )
    .with_retry_policy(config.retry)
    .with_transition_policy(config.transition_policy);

    let credentials = config
        .gateway_api_keys
        .iter()
        .fold(GatewayCredentials::new(), |creds, (id, key)| {
            creds.with_key(*id, key)
        });

    // Create and run the HTTP server
    let server = HttpServer::new(service, credentials);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Flush events accepted before shutdown
    workers.join(EVENT_DRAIN_GRACE).await;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
