//! Domain models for the payment gateway broker.

mod ids;

pub mod event;
pub mod gateway;
pub mod transaction;

pub use event::{TransactionEvent, mask};
pub use gateway::GatewayDescriptor;
pub use ids::{CountryId, GatewayId, TransactionId, UserId};
pub use transaction::{Transaction, TransactionKind, TransactionStatus, TransitionPolicy};
