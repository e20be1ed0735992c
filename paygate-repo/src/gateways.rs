//! Simulated payment processors.
//!
//! Stand-ins for real gateway integrations. Each accepts every payment and
//! hands back a unique `{name}_txn_{uuid}` reference.

use std::time::Duration;

use tokio::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use paygate_types::ports::{GatewayError, GatewayReceipt};
use paygate_types::{PaymentGateway, Transaction};

#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    name: String,
    latency: Duration,
}

impl SimulatedGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latency: Duration::ZERO,
        }
    }

    pub fn stripe() -> Self {
        Self::new("stripe")
    }

    pub fn paypal() -> Self {
        Self::new("paypal")
    }

    /// Delays every acceptance by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_payment(
        &self,
        tx: &Transaction,
        deadline: Instant,
    ) -> Result<GatewayReceipt, GatewayError> {
        if !self.latency.is_zero() {
            let done = Instant::now() + self.latency;
            if done > deadline {
                tokio::time::sleep_until(deadline).await;
                return Err(GatewayError::Timeout);
            }
            tokio::time::sleep_until(done).await;
        }

        let gateway_txn_id = format!("{}_txn_{}", self.name, uuid::Uuid::new_v4().simple());
        debug!(
            gateway = %self.name,
            %gateway_txn_id,
            kind = tx.kind.as_str(),
            "Payment accepted"
        );
        Ok(GatewayReceipt { gateway_txn_id })
    }
}
