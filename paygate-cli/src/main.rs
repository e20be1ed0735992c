//! Paygate CLI
//!
//! Command-line interface for the payment gateway broker API.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use paygate_client::{PaygateClient, PaymentOrder};
use paygate_repo::events::{EVENT_KEY_HEADER, SIGNATURE_HEADER};
use paygate_repo::security::verify_signature;
use paygate_types::{CountryId, GatewayId, UserId};

#[derive(Parser)]
#[command(name = "paygate")]
#[command(author, version, about = "Payment gateway broker CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Paygate API
    #[arg(
        long,
        env = "PAYGATE_API_URL",
        default_value = "http://localhost:3000"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a deposit
    Deposit(OrderArgs),
    /// Start a withdrawal
    Withdraw(OrderArgs),
    /// Send a gateway callback
    Callback {
        /// Gateway API key
        #[arg(long, env = "PAYGATE_GATEWAY_KEY")]
        gateway_key: String,
        /// Gateway transaction reference
        gateway_txn_id: String,
        /// New status (pending, completed, failed)
        status: String,
        #[arg(long)]
        error_message: Option<String>,
    },
    /// Check API health
    Health,
    /// Start a local receiver for transaction events
    Listen {
        /// Port to listen on
        #[arg(long, default_value = "3001")]
        port: u16,
        /// Secret used to verify the X-Signature header
        #[arg(long, env = "EVENT_SIGNING_SECRET")]
        secret: Option<String>,
    },
}

#[derive(Args)]
struct OrderArgs {
    /// Caller user id (sent as X-User-Id)
    #[arg(long, env = "PAYGATE_USER_ID")]
    user: i64,
    #[arg(long)]
    amount: Decimal,
    #[arg(long, default_value = "USD")]
    currency: String,
    /// Requested gateway id
    #[arg(long, default_value = "112")]
    gateway: i64,
    /// ISO 3166-1 numeric country code
    #[arg(long, default_value = "840")]
    country: i64,
    /// Generated when omitted
    #[arg(long)]
    idempotency_key: Option<String>,
}

impl From<OrderArgs> for PaymentOrder {
    fn from(args: OrderArgs) -> Self {
        PaymentOrder {
            user_id: UserId::new(args.user),
            amount: args.amount,
            currency: args.currency,
            gateway_id: GatewayId::new(args.gateway),
            country_id: CountryId::new(args.country),
            idempotency_key: args
                .idempotency_key
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let client = PaygateClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }

        Commands::Deposit(args) => {
            let result = client.deposit(&args.into()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Withdraw(args) => {
            let result = client.withdraw(&args.into()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Callback {
            gateway_key,
            gateway_txn_id,
            status,
            error_message,
        } => {
            let response = client
                .with_gateway_key(gateway_key)
                .callback(&gateway_txn_id, &status, error_message)
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Listen { port, secret } => {
            let app = axum::Router::new()
                .route("/events", axum::routing::post(handle_event))
                .with_state(Arc::new(secret));
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
            println!("Listening for transaction events on http://{}/events", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn handle_event(
    State(secret): State<Arc<Option<String>>>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let key = headers
        .get(EVENT_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    let verdict = match secret.as_deref() {
        None => "unsigned",
        Some(secret) => {
            let signature = headers
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if verify_signature(body.as_bytes(), signature, secret) {
                "signature ok"
            } else {
                println!("event {key}: bad signature, rejected");
                return StatusCode::UNAUTHORIZED;
            }
        }
    };

    println!("event {key} ({verdict})");
    println!("{}", body);
    println!("----------------------------------------");
    StatusCode::OK
}
