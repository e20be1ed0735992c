//! Bounded-retry gateway invocation.

use std::time::Duration;

use tokio::time::Instant;

use paygate_types::Transaction;
use paygate_types::ports::{GatewayError, GatewayReceipt, PaymentGateway};

/// Retry settings for gateway calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Deadline applied to every attempt independently
    pub attempt_timeout: Duration,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(20),
            delay: Duration::ZERO,
        }
    }
}

/// Every attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("gateway {gateway} failed after {attempts} attempts: {last_error}")]
pub struct RetriesExhausted {
    pub gateway: String,
    pub attempts: u32,
    pub last_error: GatewayError,
}

/// Calls a gateway up to `max_attempts` times, each under its own deadline.
#[derive(Debug, Clone, Default)]
pub struct RetryingInvoker {
    policy: RetryPolicy,
}

impl RetryingInvoker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the first successful receipt.
    ///
    /// An attempt that overruns its deadline counts as a failure; a receipt
    /// with an empty reference is treated as a transport error.
    pub async fn invoke(
        &self,
        gateway: &dyn PaymentGateway,
        tx: &Transaction,
    ) -> Result<GatewayReceipt, RetriesExhausted> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = GatewayError::Timeout;

        for attempt in 1..=attempts {
            match self.attempt(gateway, tx).await {
                Ok(receipt) => {
                    tracing::debug!(
                        gateway = gateway.name(),
                        attempt,
                        gateway_txn_id = %receipt.gateway_txn_id,
                        "Gateway accepted payment"
                    );
                    return Ok(receipt);
                }
                Err(e) => {
                    tracing::warn!(
                        gateway = gateway.name(),
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Gateway attempt failed"
                    );
                    last_error = e;
                }
            }

            if attempt < attempts && !self.policy.delay.is_zero() {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        Err(RetriesExhausted {
            gateway: gateway.name().to_string(),
            attempts,
            last_error,
        })
    }

    async fn attempt(
        &self,
        gateway: &dyn PaymentGateway,
        tx: &Transaction,
    ) -> Result<GatewayReceipt, GatewayError> {
        let deadline = Instant::now() + self.policy.attempt_timeout;
        let receipt =
            match tokio::time::timeout(self.policy.attempt_timeout, gateway.process_payment(tx, deadline))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(GatewayError::Timeout),
            };

        if receipt.gateway_txn_id.is_empty() {
            return Err(GatewayError::Transport(
                "gateway returned an empty transaction reference".into(),
            ));
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use paygate_types::{CountryId, GatewayId, TransactionRequest, UserId};
    use rust_decimal_macros::dec;

    /// Fails the first `failures` calls, then succeeds.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        hang: bool,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                hang: false,
            }
        }

        fn hanging(failures: u32) -> Self {
            Self {
                hang: true,
                ..Self::new(failures)
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentGateway for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn process_payment(
            &self,
            _tx: &Transaction,
            _deadline: Instant,
        ) -> Result<GatewayReceipt, GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                if self.hang {
                    std::future::pending::<()>().await;
                }
                return Err(GatewayError::Transport(format!("attempt {n} refused")));
            }
            Ok(GatewayReceipt {
                gateway_txn_id: format!("flaky_txn_{n}"),
            })
        }
    }

    struct Blank;

    #[async_trait]
    impl PaymentGateway for Blank {
        fn name(&self) -> &str {
            "blank"
        }

        async fn process_payment(
            &self,
            _tx: &Transaction,
            _deadline: Instant,
        ) -> Result<GatewayReceipt, GatewayError> {
            Ok(GatewayReceipt {
                gateway_txn_id: String::new(),
            })
        }
    }

    fn tx() -> Transaction {
        Transaction::deposit(&TransactionRequest {
            amount: dec!(10),
            currency: "USD".into(),
            gateway_id: GatewayId::new(1),
            country_id: CountryId::new(840),
            user_id: UserId::new(1),
            idempotency_key: None,
        })
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let gateway = Flaky::new(2);
        let receipt = RetryingInvoker::default().invoke(&gateway, &tx()).await.unwrap();

        assert_eq!(receipt.gateway_txn_id, "flaky_txn_3");
        assert_eq!(gateway.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let gateway = Flaky::new(u32::MAX);
        let err = RetryingInvoker::default().invoke(&gateway, &tx()).await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(gateway.calls(), 3);
        assert!(matches!(err.last_error, GatewayError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out_and_retries() {
        let gateway = Flaky::hanging(1);
        let invoker = RetryingInvoker::new(RetryPolicy {
            attempt_timeout: Duration::from_secs(1),
            ..RetryPolicy::default()
        });

        let receipt = invoker.invoke(&gateway, &tx()).await.unwrap();
        assert_eq!(receipt.gateway_txn_id, "flaky_txn_2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_hangs() {
        let gateway = Flaky::hanging(u32::MAX);
        let invoker = RetryingInvoker::new(RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(50),
            delay: Duration::from_millis(10),
        });

        let err = invoker.invoke(&gateway, &tx()).await.unwrap_err();
        assert!(matches!(err.last_error, GatewayError::Timeout));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_reference_is_a_failure() {
        let err = RetryingInvoker::default().invoke(&Blank, &tx()).await.unwrap_err();
        assert!(matches!(err.last_error, GatewayError::Transport(_)));
    }
}
