//! In-memory [`NetEnv`] implementation.
//!
//! Backs the daemon harness (seeded from a topology file) and the test
//! suite. All state lives behind a single mutex, so each trait call is
//! atomic, matching the single-call semantics the real environment offers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::env::NetEnv;
use crate::error::EnvError;
use crate::types::{AccessVector, NodeFacts, ProcessInfo};

/// Seed description of a single node. Built with the `with_*` helpers and
/// handed to [`SimNet::add_node`].
#[derive(Debug, Clone)]
pub struct SimNode {
    pub hostname: String,
    pub required_skill: u32,
    pub required_vectors: u32,
    pub is_owned: bool,
    pub has_access: bool,
    pub max_value: f64,
    pub total_capacity: f64,
    pub base_used: f64,
    pub backdoor_installed: bool,
}

impl SimNode {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            required_skill: 1,
            required_vectors: 0,
            is_owned: false,
            has_access: false,
            max_value: 0.0,
            total_capacity: 0.0,
            base_used: 0.0,
            backdoor_installed: false,
        }
    }

    pub fn with_skill(mut self, required_skill: u32) -> Self {
        self.required_skill = required_skill;
        self
    }

    pub fn with_required_vectors(mut self, count: u32) -> Self {
        self.required_vectors = count;
        self
    }

    pub fn owned(mut self) -> Self {
        self.is_owned = true;
        self.has_access = true;
        self
    }

    pub fn accessible(mut self) -> Self {
        self.has_access = true;
        self
    }

    pub fn with_value(mut self, max_value: f64) -> Self {
        self.max_value = max_value;
        self
    }

    pub fn with_capacity(mut self, total: f64) -> Self {
        self.total_capacity = total;
        self
    }

    pub fn with_used(mut self, used: f64) -> Self {
        self.base_used = used;
        self
    }

    pub fn with_backdoor(mut self) -> Self {
        self.backdoor_installed = true;
        self
    }
}

struct NodeState {
    seed: SimNode,
    open_vectors: HashSet<AccessVector>,
    failing_vectors: HashSet<AccessVector>,
    neighbors: Vec<String>,
    files: HashMap<String, String>,
    processes: Vec<ProcessInfo>,
}

struct Contract {
    kind: String,
    data: Value,
    remaining: u32,
    fresh: u32,
    solution: Value,
}

#[derive(Default)]
struct SimState {
    actor_skill: u32,
    nodes: HashMap<String, NodeState>,
    purchased: Vec<String>,
    payload_costs: HashMap<String, f64>,
    // BTreeMap keyed (hostname, filename) for deterministic listing order.
    contracts: BTreeMap<(String, String), Contract>,
    fail_stage_on: HashSet<String>,
    fail_launch_on: HashSet<String>,
    next_pid: u32,
}

/// Thread-safe in-memory network simulation.
pub struct SimNet {
    state: Mutex<SimState>,
}

impl SimNet {
    pub fn new(actor_skill: u32) -> Self {
        Self {
            state: Mutex::new(SimState {
                actor_skill,
                next_pid: 1,
                ..SimState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Seeding ───────────────────────────────────────────────

    pub fn add_node(&self, seed: SimNode) {
        let mut state = self.lock();
        state.nodes.insert(
            seed.hostname.clone(),
            NodeState {
                seed,
                open_vectors: HashSet::new(),
                failing_vectors: HashSet::new(),
                neighbors: Vec::new(),
                files: HashMap::new(),
                processes: Vec::new(),
            },
        );
    }

    /// Connect two nodes bidirectionally. Neighbor order follows insertion.
    pub fn connect(&self, a: &str, b: &str) {
        let mut state = self.lock();
        if let Some(node) = state.nodes.get_mut(a) {
            if !node.neighbors.iter().any(|n| n == b) {
                node.neighbors.push(b.to_string());
            }
        }
        if let Some(node) = state.nodes.get_mut(b) {
            if !node.neighbors.iter().any(|n| n == a) {
                node.neighbors.push(a.to_string());
            }
        }
    }

    pub fn add_purchased(&self, hostname: &str) {
        self.lock().purchased.push(hostname.to_string());
    }

    pub fn register_payload(&self, name: &str, cost: f64) {
        self.lock().payload_costs.insert(name.to_string(), cost);
    }

    pub fn place_contract(
        &self,
        hostname: &str,
        filename: &str,
        kind: &str,
        data: Value,
        fresh_attempts: u32,
        solution: Value,
    ) {
        self.lock().contracts.insert(
            (hostname.to_string(), filename.to_string()),
            Contract {
                kind: kind.to_string(),
                data,
                remaining: fresh_attempts,
                fresh: fresh_attempts,
                solution,
            },
        );
    }

    pub fn set_remaining_attempts(&self, hostname: &str, filename: &str, remaining: u32) {
        if let Some(contract) = self
            .lock()
            .contracts
            .get_mut(&(hostname.to_string(), filename.to_string()))
        {
            contract.remaining = remaining;
        }
    }

    /// Make a specific access vector fail on a node.
    pub fn fail_vector(&self, vector: AccessVector, hostname: &str) {
        if let Some(node) = self.lock().nodes.get_mut(hostname) {
            node.failing_vectors.insert(vector);
        }
    }

    /// Make all stage calls onto a node fail.
    pub fn fail_stage(&self, hostname: &str) {
        self.lock().fail_stage_on.insert(hostname.to_string());
    }

    /// Make all launches on a node fail.
    pub fn fail_launch(&self, hostname: &str) {
        self.lock().fail_launch_on.insert(hostname.to_string());
    }

    // ── Inspection helpers for tests ──────────────────────────

    pub fn total_threads_of(&self, payload: &str, target: &str) -> u32 {
        let state = self.lock();
        state
            .nodes
            .values()
            .flat_map(|n| n.processes.iter())
            .filter(|p| p.payload == payload && p.args.first().map(String::as_str) == Some(target))
            .map(|p| p.threads)
            .sum()
    }

    pub fn contract_exists(&self, hostname: &str, filename: &str) -> bool {
        self.lock()
            .contracts
            .contains_key(&(hostname.to_string(), filename.to_string()))
    }
}

impl NetEnv for SimNet {
    fn neighbors(&self, hostname: &str) -> Vec<String> {
        self.lock()
            .nodes
            .get(hostname)
            .map(|n| n.neighbors.clone())
            .unwrap_or_default()
    }

    fn node(&self, hostname: &str) -> Result<NodeFacts, EnvError> {
        let state = self.lock();
        let node = state
            .nodes
            .get(hostname)
            .ok_or_else(|| EnvError::NodeNotFound(hostname.to_string()))?;
        let process_used: f64 = node
            .processes
            .iter()
            .map(|p| {
                p.threads as f64 * state.payload_costs.get(&p.payload).copied().unwrap_or(0.0)
            })
            .sum();
        Ok(NodeFacts {
            hostname: node.seed.hostname.clone(),
            required_skill: node.seed.required_skill,
            open_vector_count: node.open_vectors.len() as u32,
            required_vector_count: node.seed.required_vectors,
            has_access: node.seed.has_access,
            is_owned: node.seed.is_owned,
            max_value: node.seed.max_value,
            used_capacity: node.seed.base_used + process_used,
            total_capacity: node.seed.total_capacity,
            backdoor_installed: node.seed.backdoor_installed,
        })
    }

    fn actor_skill_level(&self) -> u32 {
        self.lock().actor_skill
    }

    fn purchased_nodes(&self) -> Vec<String> {
        self.lock().purchased.clone()
    }

    fn open_access_vector(&self, vector: AccessVector, hostname: &str) -> Result<(), EnvError> {
        let mut state = self.lock();
        let node = state
            .nodes
            .get_mut(hostname)
            .ok_or_else(|| EnvError::NodeNotFound(hostname.to_string()))?;
        if node.failing_vectors.contains(&vector) {
            return Err(EnvError::VectorFailed {
                vector,
                hostname: hostname.to_string(),
            });
        }
        node.open_vectors.insert(vector);
        Ok(())
    }

    fn elevate(&self, hostname: &str) -> Result<(), EnvError> {
        let mut state = self.lock();
        let node = state
            .nodes
            .get_mut(hostname)
            .ok_or_else(|| EnvError::NodeNotFound(hostname.to_string()))?;
        if (node.open_vectors.len() as u32) < node.seed.required_vectors {
            return Err(EnvError::ElevationDenied(hostname.to_string()));
        }
        node.seed.has_access = true;
        Ok(())
    }

    fn list_processes(&self, hostname: &str) -> Vec<ProcessInfo> {
        self.lock()
            .nodes
            .get(hostname)
            .map(|n| n.processes.clone())
            .unwrap_or_default()
    }

    fn payload_cost(&self, payload: &str) -> f64 {
        self.lock().payload_costs.get(payload).copied().unwrap_or(0.0)
    }

    fn stage(&self, payload: &str, hostname: &str) -> Result<(), EnvError> {
        let mut state = self.lock();
        if state.fail_stage_on.contains(hostname) {
            return Err(EnvError::Io(format!("stage refused on {hostname}")));
        }
        if !state.payload_costs.contains_key(payload) {
            return Err(EnvError::Io(format!("unknown payload {payload}")));
        }
        let node = state
            .nodes
            .get_mut(hostname)
            .ok_or_else(|| EnvError::NodeNotFound(hostname.to_string()))?;
        node.files.insert(payload.to_string(), String::new());
        Ok(())
    }

    fn launch(&self, payload: &str, hostname: &str, threads: u32, args: &[String]) -> u32 {
        let mut state = self.lock();
        if threads == 0 || state.fail_launch_on.contains(hostname) {
            return 0;
        }
        let cost = state.payload_costs.get(payload).copied().unwrap_or(0.0);
        let Some(node) = state.nodes.get(hostname) else {
            return 0;
        };
        if !node.files.contains_key(payload) {
            return 0;
        }
        // Same payload with identical args is already running.
        if node
            .processes
            .iter()
            .any(|p| p.payload == payload && p.args == args)
        {
            return 0;
        }
        let process_used: f64 = node
            .processes
            .iter()
            .map(|p| {
                p.threads as f64 * state.payload_costs.get(&p.payload).copied().unwrap_or(0.0)
            })
            .sum();
        let free = node.seed.total_capacity - node.seed.base_used - process_used;
        if threads as f64 * cost > free {
            return 0;
        }
        let pid = state.next_pid;
        state.next_pid += 1;
        if let Some(node) = state.nodes.get_mut(hostname) {
            node.processes.push(ProcessInfo {
                pid,
                payload: payload.to_string(),
                args: args.to_vec(),
                threads,
            });
            pid
        } else {
            0
        }
    }

    fn list_contract_files(&self, hostname: &str) -> Vec<String> {
        self.lock()
            .contracts
            .keys()
            .filter(|(host, _)| host == hostname)
            .map(|(_, file)| file.clone())
            .collect()
    }

    fn remaining_attempts(&self, filename: &str, hostname: &str) -> Result<u32, EnvError> {
        self.lock()
            .contracts
            .get(&(hostname.to_string(), filename.to_string()))
            .map(|c| c.remaining)
            .ok_or_else(|| EnvError::ContractNotFound {
                filename: filename.to_string(),
                hostname: hostname.to_string(),
            })
    }

    fn fresh_attempts(&self, filename: &str, hostname: &str) -> Result<u32, EnvError> {
        self.lock()
            .contracts
            .get(&(hostname.to_string(), filename.to_string()))
            .map(|c| c.fresh)
            .ok_or_else(|| EnvError::ContractNotFound {
                filename: filename.to_string(),
                hostname: hostname.to_string(),
            })
    }

    fn contract_type(&self, filename: &str, hostname: &str) -> Result<String, EnvError> {
        self.lock()
            .contracts
            .get(&(hostname.to_string(), filename.to_string()))
            .map(|c| c.kind.clone())
            .ok_or_else(|| EnvError::ContractNotFound {
                filename: filename.to_string(),
                hostname: hostname.to_string(),
            })
    }

    fn contract_data(&self, filename: &str, hostname: &str) -> Result<Value, EnvError> {
        self.lock()
            .contracts
            .get(&(hostname.to_string(), filename.to_string()))
            .map(|c| c.data.clone())
            .ok_or_else(|| EnvError::ContractNotFound {
                filename: filename.to_string(),
                hostname: hostname.to_string(),
            })
    }

    fn attempt_solution(
        &self,
        answer: &Value,
        filename: &str,
        hostname: &str,
    ) -> Result<bool, EnvError> {
        let mut state = self.lock();
        let key = (hostname.to_string(), filename.to_string());
        let contract = state
            .contracts
            .get_mut(&key)
            .ok_or_else(|| EnvError::ContractNotFound {
                filename: filename.to_string(),
                hostname: hostname.to_string(),
            })?;
        if *answer == contract.solution {
            state.contracts.remove(&key);
            Ok(true)
        } else {
            contract.remaining = contract.remaining.saturating_sub(1);
            Ok(false)
        }
    }

    fn file_exists(&self, name: &str, hostname: &str) -> bool {
        self.lock()
            .nodes
            .get(hostname)
            .map(|n| n.files.contains_key(name))
            .unwrap_or(false)
    }

    fn write_file(&self, name: &str, hostname: &str, contents: &str) -> Result<(), EnvError> {
        let mut state = self.lock();
        let node = state
            .nodes
            .get_mut(hostname)
            .ok_or_else(|| EnvError::NodeNotFound(hostname.to_string()))?;
        node.files.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn remove_file(&self, name: &str, hostname: &str) -> Result<bool, EnvError> {
        let mut state = self.lock();
        let node = state
            .nodes
            .get_mut(hostname)
            .ok_or_else(|| EnvError::NodeNotFound(hostname.to_string()))?;
        Ok(node.files.remove(name).is_some())
    }

    fn read_file(&self, name: &str, hostname: &str) -> Option<String> {
        self.lock()
            .nodes
            .get(hostname)
            .and_then(|n| n.files.get(name).cloned())
    }
}
