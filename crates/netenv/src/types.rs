use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the independent exploits that must be opened before a node can be
/// elevated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessVector {
    Ssh,
    Ftp,
    Smtp,
    Http,
    Sql,
}

impl AccessVector {
    /// All known vectors, in the order they are attempted.
    pub const ALL: [AccessVector; 5] = [
        AccessVector::Ssh,
        AccessVector::Ftp,
        AccessVector::Smtp,
        AccessVector::Http,
        AccessVector::Sql,
    ];
}

impl fmt::Display for AccessVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessVector::Ssh => "ssh",
            AccessVector::Ftp => "ftp",
            AccessVector::Smtp => "smtp",
            AccessVector::Http => "http",
            AccessVector::Sql => "sql",
        };
        f.write_str(name)
    }
}

/// Point-in-time facts about a node, as reported by the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFacts {
    pub hostname: String,
    /// Minimum actor skill level required to work with the node.
    pub required_skill: u32,
    /// Access vectors currently open.
    pub open_vector_count: u32,
    /// Access vectors that must be open before elevation succeeds.
    pub required_vector_count: u32,
    /// Whether the actor already has elevated access.
    pub has_access: bool,
    /// Player-owned nodes skip all classification gates.
    pub is_owned: bool,
    /// Maximum extractable value. Zero marks a capacity-only node.
    pub max_value: f64,
    /// Capacity currently consumed by running processes.
    pub used_capacity: f64,
    pub total_capacity: f64,
    pub backdoor_installed: bool,
}

impl NodeFacts {
    pub fn free_capacity(&self) -> f64 {
        (self.total_capacity - self.used_capacity).max(0.0)
    }
}

/// A process running on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Payload (script) name.
    pub payload: String,
    pub args: Vec<String>,
    pub threads: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_capacity_never_negative() {
        let facts = NodeFacts {
            hostname: "n1".to_string(),
            required_skill: 1,
            open_vector_count: 0,
            required_vector_count: 0,
            has_access: true,
            is_owned: false,
            max_value: 0.0,
            used_capacity: 12.0,
            total_capacity: 8.0,
            backdoor_installed: false,
        };
        assert_eq!(facts.free_capacity(), 0.0);
    }

    #[test]
    fn test_access_vector_order_is_stable() {
        assert_eq!(AccessVector::ALL[0], AccessVector::Ssh);
        assert_eq!(AccessVector::ALL.len(), 5);
    }
}
