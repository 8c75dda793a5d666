use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fleet: FleetConfig,
    pub queue: QueueConfig,
    pub solver: SolverConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            fleet: FleetConfig::from_env(),
            queue: QueueConfig::from_env(),
            solver: SolverConfig::from_env(),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  fleet:  root={}, payload={}, budget={}, ceiling={}, scan_interval={}s",
            self.fleet.root_host,
            self.fleet.worker_payload,
            self.fleet.capacity_budget,
            self.fleet.payload_cost_ceiling,
            self.fleet.scan_interval_secs,
        );
        tracing::info!(
            "  queue:  port={}, capacity={}",
            self.queue.port,
            self.queue.capacity
        );
        tracing::info!(
            "  solver: url={}, poll_interval={}s",
            self.solver.base_url,
            self.solver.poll_interval_secs,
        );
    }
}

// ── Fleet (scanner / scheduler) ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Hostname the topology scan starts from. Also the lowest-priority
    /// compute donor.
    pub root_host: String,
    /// Name of the worker payload dispatched against targets.
    pub worker_payload: String,
    /// Global per-target capacity budget (`B`), in RAM units.
    pub capacity_budget: f64,
    /// Hard ceiling on the worker payload's per-thread cost. Exceeding it is
    /// a fatal misconfiguration and aborts startup.
    pub payload_cost_ceiling: f64,
    /// Purchased-node name prefixes that seed the exec pool.
    pub pool_prefixes: Vec<String>,
    /// Seconds to suspend between scan cycles.
    pub scan_interval_secs: u64,
}

impl FleetConfig {
    fn from_env() -> Self {
        Self {
            root_host: env_or("SPIDER_ROOT_HOST", "home"),
            worker_payload: env_or("SPIDER_WORKER_PAYLOAD", "harvest.js"),
            capacity_budget: env_f64("SPIDER_CAPACITY_BUDGET", 33272.0),
            payload_cost_ceiling: env_f64("SPIDER_PAYLOAD_COST_CEILING", 1_048_576.0),
            pool_prefixes: env_or("SPIDER_POOL_PREFIXES", "exec-node,capacity-node")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            scan_interval_secs: env_u64("SPIDER_SCAN_INTERVAL_SECS", 60),
        }
    }
}

// ── Queue (contract port) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Well-known numeric id of the contract port.
    pub port: u16,
    /// Fixed port capacity; writes beyond it are dropped.
    pub capacity: usize,
}

impl QueueConfig {
    fn from_env() -> Self {
        Self {
            port: env_u16("SPIDER_CONTRACT_PORT", 8),
            capacity: env_u64("SPIDER_PORT_CAPACITY", 50) as usize,
        }
    }
}

// ── Solver service ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Base URL of the solver service (no path).
    pub base_url: String,
    /// Seconds to suspend between consumer drain passes.
    pub poll_interval_secs: u64,
    /// Consecutive transport failures before escalating to an error log.
    pub transport_warn_threshold: u32,
}

impl SolverConfig {
    fn from_env() -> Self {
        Self {
            base_url: env_or("SPIDER_SOLVER_URL", "http://localhost:8080"),
            poll_interval_secs: env_u64("SPIDER_CONSUMER_POLL_SECS", 20),
            transport_warn_threshold: env_u32("SPIDER_TRANSPORT_WARN_THRESHOLD", 3),
        }
    }
}
