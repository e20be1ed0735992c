//! Payment gateway ports.
//!
//! `GatewayDirectory` lists which gateways are enabled per country;
//! `PaymentGateway` is the uniform process-payment contract every concrete
//! gateway integration implements.

use tokio::time::Instant;

use crate::domain::{CountryId, GatewayDescriptor, Transaction};

/// Error type for gateway directory lookups.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No gateway is configured for the country. Callers fall back to the default gateway.
    #[error("No gateways available for this country")]
    NotFound,

    #[error("Gateway directory unavailable: {0}")]
    Unavailable(String),
}

/// Port trait for gateway reference data.
#[async_trait::async_trait]
pub trait GatewayDirectory: Send + Sync {
    /// Gateways enabled for `country`, in preference order.
    ///
    /// Never returns an empty list: an empty result is reported as
    /// [`DirectoryError::NotFound`].
    async fn list_for_country(
        &self,
        country: CountryId,
    ) -> Result<Vec<GatewayDescriptor>, DirectoryError>;
}

/// Successful gateway acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReceipt {
    /// Unique reference assigned by the gateway
    pub gateway_txn_id: String,
}

/// Error type for a single gateway attempt.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Gateway transport error: {0}")]
    Transport(String),

    #[error("Gateway attempt timed out")]
    Timeout,
}

/// Port trait for a payment processor.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Name used by the gateway directory (e.g. "stripe").
    fn name(&self) -> &str;

    /// Submits the payment. Implementations should not run past `deadline`;
    /// callers cancel the attempt once it passes.
    async fn process_payment(
        &self,
        tx: &Transaction,
        deadline: Instant,
    ) -> Result<GatewayReceipt, GatewayError>;
}
