//! Gateway selection.
//!
//! Resolves the concrete [`PaymentGateway`] for a transaction from the
//! directory's per-country list. Selection never fails: every miss falls back
//! to a default implementation, and the resolution says why.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use paygate_types::ports::DirectoryError;
use paygate_types::{CountryId, GatewayDirectory, GatewayId, PaymentGateway};

/// Why the selector did not use the requested gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultReason {
    /// The directory lookup failed.
    DirectoryUnavailable(String),
    /// The country has no gateways configured.
    NoGatewaysForCountry,
    /// The requested gateway is not offered in the country; the first listed one is used.
    RequestedNotOffered {
        requested: GatewayId,
        fallback: GatewayId,
    },
    /// The directory named a gateway this process has no implementation for.
    UnknownImplementation(String),
}

impl fmt::Display for DefaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultReason::DirectoryUnavailable(e) => write!(f, "directory unavailable: {e}"),
            DefaultReason::NoGatewaysForCountry => f.write_str("no gateways for country"),
            DefaultReason::RequestedNotOffered {
                requested,
                fallback,
            } => write!(f, "gateway {requested} not offered, using {fallback}"),
            DefaultReason::UnknownImplementation(name) => {
                write!(f, "no implementation named {name:?}")
            }
        }
    }
}

/// Outcome of gateway selection.
#[derive(Clone)]
pub enum GatewayResolution {
    /// The requested gateway is offered and implemented.
    Resolved { gateway: Arc<dyn PaymentGateway> },
    /// A default was chosen instead.
    Defaulted {
        gateway: Arc<dyn PaymentGateway>,
        reason: DefaultReason,
    },
}

impl GatewayResolution {
    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        match self {
            GatewayResolution::Resolved { gateway } => gateway,
            GatewayResolution::Defaulted { gateway, .. } => gateway,
        }
    }

    pub fn into_gateway(self) -> Arc<dyn PaymentGateway> {
        match self {
            GatewayResolution::Resolved { gateway } => gateway,
            GatewayResolution::Defaulted { gateway, .. } => gateway,
        }
    }

    pub fn default_reason(&self) -> Option<&DefaultReason> {
        match self {
            GatewayResolution::Resolved { .. } => None,
            GatewayResolution::Defaulted { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Debug for GatewayResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayResolution::Resolved { gateway } => f
                .debug_struct("Resolved")
                .field("gateway", &gateway.name())
                .finish(),
            GatewayResolution::Defaulted { gateway, reason } => f
                .debug_struct("Defaulted")
                .field("gateway", &gateway.name())
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Strategy for picking a gateway. Injected into the payment service.
#[async_trait]
pub trait GatewaySelector: Send + Sync {
    async fn select(&self, country: CountryId, requested: GatewayId) -> GatewayResolution;
}

/// Name → implementation mapping with a mandatory default.
#[derive(Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
    default: Arc<dyn PaymentGateway>,
}

impl GatewayRegistry {
    /// Creates a registry whose fallback is `default` (also registered under its own name).
    pub fn new(default: Arc<dyn PaymentGateway>) -> Self {
        let mut gateways = HashMap::new();
        gateways.insert(default.name().to_string(), default.clone());
        Self { gateways, default }
    }

    pub fn register(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.name().to_string(), gateway);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PaymentGateway>> {
        self.gateways.get(name).cloned()
    }

    pub fn default_gateway(&self) -> Arc<dyn PaymentGateway> {
        self.default.clone()
    }

    /// Resolves `name`, falling back to the default for unknown names.
    pub fn resolve(&self, name: &str) -> GatewayResolution {
        match self.get(name) {
            Some(gateway) => GatewayResolution::Resolved { gateway },
            None => GatewayResolution::Defaulted {
                gateway: self.default_gateway(),
                reason: DefaultReason::UnknownImplementation(name.to_string()),
            },
        }
    }
}

/// Selector backed by a [`GatewayDirectory`].
pub struct DirectorySelector {
    directory: Arc<dyn GatewayDirectory>,
    registry: GatewayRegistry,
}

impl DirectorySelector {
    pub fn new(directory: Arc<dyn GatewayDirectory>, registry: GatewayRegistry) -> Self {
        Self {
            directory,
            registry,
        }
    }
}

#[async_trait]
impl GatewaySelector for DirectorySelector {
    async fn select(&self, country: CountryId, requested: GatewayId) -> GatewayResolution {
        let available = match self.directory.list_for_country(country).await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) | Err(DirectoryError::NotFound) => {
                return GatewayResolution::Defaulted {
                    gateway: self.registry.default_gateway(),
                    reason: DefaultReason::NoGatewaysForCountry,
                };
            }
            Err(DirectoryError::Unavailable(e)) => {
                return GatewayResolution::Defaulted {
                    gateway: self.registry.default_gateway(),
                    reason: DefaultReason::DirectoryUnavailable(e),
                };
            }
        };

        if let Some(descriptor) = available.iter().find(|g| g.id == requested) {
            return self.registry.resolve(&descriptor.name);
        }

        let first = &available[0];
        match self.registry.resolve(&first.name) {
            GatewayResolution::Resolved { gateway } => GatewayResolution::Defaulted {
                gateway,
                reason: DefaultReason::RequestedNotOffered {
                    requested,
                    fallback: first.id,
                },
            },
            unknown => unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    use paygate_types::ports::{GatewayError, GatewayReceipt};
    use paygate_types::{GatewayDescriptor, Transaction};

    struct NamedGateway(&'static str);

    #[async_trait]
    impl PaymentGateway for NamedGateway {
        fn name(&self) -> &str {
            self.0
        }

        async fn process_payment(
            &self,
            _tx: &Transaction,
            _deadline: Instant,
        ) -> Result<GatewayReceipt, GatewayError> {
            Ok(GatewayReceipt {
                gateway_txn_id: format!("{}_txn", self.0),
            })
        }
    }

    enum Directory {
        Gateways(Vec<GatewayDescriptor>),
        Empty,
        Down,
    }

    #[async_trait]
    impl GatewayDirectory for Directory {
        async fn list_for_country(
            &self,
            _country: CountryId,
        ) -> Result<Vec<GatewayDescriptor>, DirectoryError> {
            match self {
                Directory::Gateways(list) => Ok(list.clone()),
                Directory::Empty => Err(DirectoryError::NotFound),
                Directory::Down => Err(DirectoryError::Unavailable("connection refused".into())),
            }
        }
    }

    fn selector(directory: Directory) -> DirectorySelector {
        let registry = GatewayRegistry::new(Arc::new(NamedGateway("stripe")))
            .register(Arc::new(NamedGateway("paypal")));
        DirectorySelector::new(Arc::new(directory), registry)
    }

    fn listed() -> Directory {
        Directory::Gateways(vec![
            GatewayDescriptor::new(200, "paypal"),
            GatewayDescriptor::new(112, "stripe"),
            GatewayDescriptor::new(300, "revolut"),
        ])
    }

    #[tokio::test]
    async fn test_requested_gateway_is_resolved() {
        let res = selector(listed())
            .select(CountryId::new(840), GatewayId::new(112))
            .await;

        assert!(matches!(res, GatewayResolution::Resolved { .. }));
        assert_eq!(res.gateway().name(), "stripe");
    }

    #[tokio::test]
    async fn test_unoffered_gateway_uses_first_listed() {
        let res = selector(listed())
            .select(CountryId::new(840), GatewayId::new(999))
            .await;

        assert_eq!(res.gateway().name(), "paypal");
        assert_eq!(
            res.default_reason(),
            Some(&DefaultReason::RequestedNotOffered {
                requested: GatewayId::new(999),
                fallback: GatewayId::new(200),
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_implementation_defaults() {
        let res = selector(listed())
            .select(CountryId::new(840), GatewayId::new(300))
            .await;

        assert_eq!(res.gateway().name(), "stripe");
        assert_eq!(
            res.default_reason(),
            Some(&DefaultReason::UnknownImplementation("revolut".into()))
        );
    }

    #[tokio::test]
    async fn test_country_without_gateways_defaults() {
        let res = selector(Directory::Empty)
            .select(CountryId::new(4), GatewayId::new(112))
            .await;

        assert_eq!(res.gateway().name(), "stripe");
        assert_eq!(res.default_reason(), Some(&DefaultReason::NoGatewaysForCountry));
    }

    #[tokio::test]
    async fn test_directory_failure_defaults() {
        let res = selector(Directory::Down)
            .select(CountryId::new(840), GatewayId::new(200))
            .await;

        assert_eq!(res.gateway().name(), "stripe");
        assert!(matches!(
            res.default_reason(),
            Some(DefaultReason::DirectoryUnavailable(_))
        ));
    }
}
