//! Numeric identifiers.
//!
//! Every identity in this system is an opaque integer handed to us by some
//! other party (the store, the identity layer, the gateway directory), so the
//! newtypes only exist to keep them from being mixed up.

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Identifiers coming from callers must be strictly positive.
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

numeric_id!(
    /// Identifier assigned by the transaction store on first persistence.
    TransactionId
);
numeric_id!(
    /// Owner of a transaction, supplied by the identity layer.
    UserId
);
numeric_id!(
    /// Payment gateway identifier from the gateway directory.
    GatewayId
);
numeric_id!(
    /// ISO 3166-1 numeric country code.
    CountryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: GatewayId = " 112 ".parse().unwrap();
        assert_eq!(id, GatewayId::new(112));
        assert_eq!(id.to_string(), "112");
    }

    #[test]
    fn test_validity() {
        assert!(CountryId::new(840).is_valid());
        assert!(!CountryId::new(0).is_valid());
        assert!(!UserId::new(-1).is_valid());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&TransactionId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
