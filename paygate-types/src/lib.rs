//! # Paygate Types
//!
//! Domain types and port traits for the payment gateway broker.
//! This crate has no IO of its own - only data structures, business rules,
//! and trait definitions. Gateway deadlines use tokio's clock so they follow
//! a paused test runtime.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Transaction, GatewayDescriptor, TransactionEvent)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    CountryId, GatewayDescriptor, GatewayId, Transaction, TransactionEvent, TransactionId,
    TransactionKind, TransactionStatus, TransitionPolicy, UserId,
};
pub use dto::*;
pub use error::{AppError, DomainError, ErrorKind, RepoError};
pub use ports::{
    BalanceProvider, ComplianceChecker, EventBus, GatewayDirectory, PaymentGateway,
    TransactionStore,
};
