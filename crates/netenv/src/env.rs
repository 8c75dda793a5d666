//! The [`NetEnv`] trait: every environment primitive the daemon consumes.
//!
//! All calls have atomic single-call semantics; the environment itself is the
//! only state shared between the scan cycle and the dispatch consumer besides
//! the contract port.

use serde_json::Value;

use crate::error::EnvError;
use crate::types::{AccessVector, NodeFacts, ProcessInfo};

pub trait NetEnv: Send + Sync {
    // ── Topology / node facts ─────────────────────────────────

    /// Hostnames directly connected to `hostname`, in the environment's
    /// native order. Unknown hosts yield an empty list.
    fn neighbors(&self, hostname: &str) -> Vec<String>;

    /// Point-in-time facts about a node.
    fn node(&self, hostname: &str) -> Result<NodeFacts, EnvError>;

    /// The actor's current skill level.
    fn actor_skill_level(&self) -> u32;

    /// Hostnames of externally supplied (purchased) nodes.
    fn purchased_nodes(&self) -> Vec<String>;

    // ── Access primitives ─────────────────────────────────────

    /// Attempt to open a single access vector on a node.
    fn open_access_vector(&self, vector: AccessVector, hostname: &str) -> Result<(), EnvError>;

    /// Elevate on a node; fails unless enough vectors are open.
    fn elevate(&self, hostname: &str) -> Result<(), EnvError>;

    // ── Process control ───────────────────────────────────────

    /// Processes currently running on a node.
    fn list_processes(&self, hostname: &str) -> Vec<ProcessInfo>;

    /// Per-thread capacity cost of a payload. Unknown payloads cost zero.
    fn payload_cost(&self, payload: &str) -> f64;

    /// Copy a payload onto a node.
    fn stage(&self, payload: &str, hostname: &str) -> Result<(), EnvError>;

    /// Launch `threads` instances of a staged payload. Returns the pid, or 0
    /// when the launch is refused (duplicate args, missing payload, or not
    /// enough free capacity).
    fn launch(&self, payload: &str, hostname: &str, threads: u32, args: &[String]) -> u32;

    // ── Contract runtime ──────────────────────────────────────

    /// Contract-bearing files present on a node.
    fn list_contract_files(&self, hostname: &str) -> Vec<String>;

    /// Attempts left on a contract.
    fn remaining_attempts(&self, filename: &str, hostname: &str) -> Result<u32, EnvError>;

    /// The runtime's fresh-contract attempt count for this contract's type.
    fn fresh_attempts(&self, filename: &str, hostname: &str) -> Result<u32, EnvError>;

    fn contract_type(&self, filename: &str, hostname: &str) -> Result<String, EnvError>;

    fn contract_data(&self, filename: &str, hostname: &str) -> Result<Value, EnvError>;

    /// Submit an answer. `Ok(true)` solves and removes the contract,
    /// `Ok(false)` is a wrong-answer verdict.
    fn attempt_solution(
        &self,
        answer: &Value,
        filename: &str,
        hostname: &str,
    ) -> Result<bool, EnvError>;

    // ── Per-node file storage ─────────────────────────────────

    fn file_exists(&self, name: &str, hostname: &str) -> bool;

    fn write_file(&self, name: &str, hostname: &str, contents: &str) -> Result<(), EnvError>;

    /// Remove a file; returns whether it existed.
    fn remove_file(&self, name: &str, hostname: &str) -> Result<bool, EnvError>;

    fn read_file(&self, name: &str, hostname: &str) -> Option<String>;
}
