//! The wire type carried over the contract port.

use serde::{Deserialize, Serialize};

/// A pending contract job: `(filename, hostname)` identifies the contract in
/// the external runtime. Type and data are resolved live by the consumer, so
/// the wire format stays minimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractJob {
    pub filename: String,
    pub hostname: String,
}

impl ContractJob {
    pub fn new(filename: &str, hostname: &str) -> Self {
        Self {
            filename: filename.to_string(),
            hostname: hostname.to_string(),
        }
    }

    /// Serialize for the port (JSON).
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_wire(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
