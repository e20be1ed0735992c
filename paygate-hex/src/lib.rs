//! # Paygate Hex
//!
//! Transaction orchestration core and HTTP adapter for the payment gateway broker.
//!
//! ## Architecture
//!
//! - `service` - Deposit/withdraw orchestration and callback reconciliation
//! - `gateway` - Gateway selection with explicit default fallback
//! - `invoker` - Bounded-retry gateway calls with per-attempt deadlines
//! - `publisher` - Queue-backed event publication behind a circuit breaker
//! - `locks` - Per-key serialization for callbacks
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `S: TransactionStore`, allowing
//! different store implementations to be injected.

pub mod gateway;
pub mod inbound;
pub mod invoker;
pub mod locks;
pub mod publisher;
pub mod service;


pub use gateway::{
    DefaultReason, DirectorySelector, GatewayRegistry, GatewayResolution, GatewaySelector,
};
pub use invoker::{RetriesExhausted, RetryPolicy, RetryingInvoker};
pub use publisher::{CircuitState, EventPublisher, PublisherConfig, PublisherWorkers};
pub use service::PaymentService;
