//! Topology seed file: describes the simulated network the daemon runs
//! against. See `config/topology.json` for a sample.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use spider_netenv::{NetEnv, SimNet, SimNode};

#[derive(Debug, Deserialize)]
pub struct TopologySeed {
    pub actor_skill: u32,
    #[serde(default)]
    pub payloads: Vec<PayloadSeed>,
    #[serde(default)]
    pub purchased: Vec<String>,
    pub nodes: Vec<NodeSeed>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
    #[serde(default)]
    pub contracts: Vec<ContractSeed>,
}

#[derive(Debug, Deserialize)]
pub struct PayloadSeed {
    pub name: String,
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct NodeSeed {
    pub hostname: String,
    #[serde(default = "default_skill")]
    pub required_skill: u32,
    #[serde(default)]
    pub required_vectors: u32,
    #[serde(default)]
    pub is_owned: bool,
    #[serde(default)]
    pub has_access: bool,
    #[serde(default)]
    pub max_value: f64,
    #[serde(default)]
    pub total_capacity: f64,
    #[serde(default)]
    pub backdoor_installed: bool,
    /// Payload names staged on this node at startup.
    #[serde(default)]
    pub staged: Vec<String>,
}

fn default_skill() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ContractSeed {
    pub hostname: String,
    pub filename: String,
    pub contract_type: String,
    pub data: Value,
    pub fresh_attempts: u32,
    #[serde(default)]
    pub remaining_attempts: Option<u32>,
    pub solution: Value,
}

/// Load a topology seed file and build the simulated environment from it.
pub fn load(path: &Path) -> anyhow::Result<SimNet> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading topology file {}", path.display()))?;
    let seed: TopologySeed = serde_json::from_str(&contents)
        .with_context(|| format!("parsing topology file {}", path.display()))?;
    Ok(build(seed))
}

fn build(seed: TopologySeed) -> SimNet {
    let net = SimNet::new(seed.actor_skill);
    for payload in &seed.payloads {
        net.register_payload(&payload.name, payload.cost);
    }
    for node in &seed.nodes {
        let mut sim = SimNode::new(&node.hostname)
            .with_skill(node.required_skill)
            .with_required_vectors(node.required_vectors)
            .with_value(node.max_value)
            .with_capacity(node.total_capacity);
        if node.is_owned {
            sim = sim.owned();
        }
        if node.has_access {
            sim = sim.accessible();
        }
        if node.backdoor_installed {
            sim = sim.with_backdoor();
        }
        net.add_node(sim);
    }
    for node in &seed.nodes {
        for payload in &node.staged {
            // Staging only fails for unregistered payloads; surface that as
            // a seed mistake rather than silently dropping it.
            if let Err(e) = net.stage(payload, &node.hostname) {
                tracing::warn!(payload = %payload, hostname = %node.hostname, error = %e, "topology staging failed");
            }
        }
    }
    for (a, b) in &seed.edges {
        net.connect(a, b);
    }
    for host in &seed.purchased {
        net.add_purchased(host);
    }
    for contract in seed.contracts {
        net.place_contract(
            &contract.hostname,
            &contract.filename,
            &contract.contract_type,
            contract.data,
            contract.fresh_attempts,
            contract.solution,
        );
        if let Some(remaining) = contract.remaining_attempts {
            net.set_remaining_attempts(&contract.hostname, &contract.filename, remaining);
        }
    }
    net
}
