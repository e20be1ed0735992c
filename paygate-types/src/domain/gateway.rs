//! Gateway reference data.

use serde::{Deserialize, Serialize};

use super::ids::GatewayId;

/// A payment gateway as listed by the gateway directory.
///
/// Read-only from the orchestrator's point of view. `name` doubles as the
/// key used to resolve the gateway implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDescriptor {
    pub id: GatewayId,
    pub name: String,
    /// Payload formats the gateway accepts (e.g. "json", "xml")
    pub data_formats: Vec<String>,
}

impl GatewayDescriptor {
    pub fn new(id: impl Into<GatewayId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_formats: vec!["json".to_string()],
        }
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_formats = formats.into_iter().map(Into::into).collect();
        self
    }
}
