//! Outbound transaction status event.

use serde::{Deserialize, Serialize};

use super::transaction::{Transaction, TransactionKind, TransactionStatus};

const VISIBLE_SUFFIX: usize = 2;

/// Masks all but the last two characters of a value with `*`.
pub fn mask(value: &str) -> String {
    let len = value.chars().count();
    if len <= VISIBLE_SUFFIX {
        return "*".repeat(len);
    }
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < len - VISIBLE_SUFFIX { '*' } else { c })
        .collect()
}

/// Status change announced to downstream consumers.
///
/// Never persisted. User id and amount are masked before they leave the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Topic key (the store-assigned transaction id)
    #[serde(skip)]
    pub key: String,
    pub status: Option<TransactionStatus>,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

impl TransactionEvent {
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            key: tx.id.map(|id| id.to_string()).unwrap_or_default(),
            status: tx.status,
            user_id: mask(&tx.user_id.to_string()),
            amount: mask(&format!("{:.2}", tx.amount)),
            kind: tx.kind,
        }
    }

    /// JSON payload published on the bus.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "userId": self.user_id,
            "amount": self.amount,
            "type": self.kind,
        })
    }
}
