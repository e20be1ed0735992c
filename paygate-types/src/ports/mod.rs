//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod checks;
mod events;
mod gateway;
mod store;

pub use checks::{BalanceError, BalanceProvider, ComplianceChecker, ComplianceError};
pub use events::{EventBus, PublishError};
pub use gateway::{DirectoryError, GatewayDirectory, GatewayError, GatewayReceipt, PaymentGateway};
pub use store::TransactionStore;
