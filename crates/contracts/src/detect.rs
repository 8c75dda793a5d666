//! Contract detection: the sole producer for the contract port.

use std::collections::HashSet;

use tracing::{debug, warn};

use spider_netenv::NetEnv;

use crate::error::QueueError;
use crate::job::ContractJob;
use crate::queue::PortRegistry;

/// Jobs already enqueued in this run, so a contract is never re-enqueued
/// while the daemon is up. Owned by the scan process; a drop caused by a
/// full port is deliberately not recorded here, so the job is retried next
/// cycle.
#[derive(Debug, Default)]
pub struct EnqueueTracker {
    seen: HashSet<ContractJob>,
}

impl EnqueueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, job: &ContractJob) -> bool {
        self.seen.contains(job)
    }

    pub fn mark(&mut self, job: ContractJob) {
        self.seen.insert(job);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// List contract files on a node and enqueue each attempted-but-unsolved
/// one onto the port. Returns whether any contract files exist at all,
/// independent of whether anything was enqueued.
///
/// A contract whose remaining attempts still equal the runtime's
/// fresh-contract count is skipped, matching the runtime's own freshness
/// accounting.
pub fn detect(
    env: &dyn NetEnv,
    ports: &PortRegistry,
    port: u16,
    tracker: &mut EnqueueTracker,
    hostname: &str,
) -> Result<bool, QueueError> {
    let files = env.list_contract_files(hostname);

    for filename in &files {
        let (remaining, fresh) = match (
            env.remaining_attempts(filename, hostname),
            env.fresh_attempts(filename, hostname),
        ) {
            (Ok(remaining), Ok(fresh)) => (remaining, fresh),
            // Contract vanished between listing and reading.
            _ => continue,
        };
        if remaining == fresh {
            continue;
        }

        let job = ContractJob::new(filename, hostname);
        if tracker.contains(&job) {
            continue;
        }
        let wire = match job.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                warn!(filename = %filename, hostname, error = %e, "failed to serialize contract job");
                continue;
            }
        };
        if ports.try_enqueue(port, &wire)? {
            debug!(filename = %filename, hostname, "enqueued contract job");
            tracker.mark(job);
        } else {
            debug!(filename = %filename, hostname, "contract port full, dropped job");
        }
    }

    Ok(!files.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spider_netenv::{SimNet, SimNode};

    fn net_with_contracts() -> SimNet {
        let net = SimNet::new(10);
        net.add_node(SimNode::new("n1").accessible());
        // Attempted once (8 of 9 remaining) -> enqueued.
        net.place_contract("n1", "a.cct", "Spiralize Matrix", json!([[1]]), 9, json!([1]));
        net.set_remaining_attempts("n1", "a.cct", 8);
        // Fresh -> skipped.
        net.place_contract("n1", "b.cct", "Generate IP Addresses", json!("25525"), 10, json!([]));
        net
    }

    #[test]
    fn test_enqueues_only_non_fresh_contracts() {
        let net = net_with_contracts();
        let ports = PortRegistry::new();
        ports.open(8, 10);
        let mut tracker = EnqueueTracker::new();

        let found = detect(&net, &ports, 8, &mut tracker, "n1").unwrap();
        assert!(found);
        assert_eq!(ports.len(8), 1);
        let job = ContractJob::from_wire(&ports.try_dequeue(8).unwrap().unwrap()).unwrap();
        assert_eq!(job.filename, "a.cct");
    }

    #[test]
    fn test_tracker_prevents_reenqueue() {
        let net = net_with_contracts();
        let ports = PortRegistry::new();
        ports.open(8, 10);
        let mut tracker = EnqueueTracker::new();

        detect(&net, &ports, 8, &mut tracker, "n1").unwrap();
        detect(&net, &ports, 8, &mut tracker, "n1").unwrap();
        assert_eq!(ports.len(8), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_full_port_drop_is_retried_next_cycle() {
        let net = net_with_contracts();
        let ports = PortRegistry::new();
        ports.open(8, 1);
        ports.try_enqueue(8, "occupied").unwrap();
        let mut tracker = EnqueueTracker::new();

        detect(&net, &ports, 8, &mut tracker, "n1").unwrap();
        // Dropped, so the tracker must not remember it.
        assert!(tracker.is_empty());

        ports.try_dequeue(8).unwrap();
        detect(&net, &ports, 8, &mut tracker, "n1").unwrap();
        assert_eq!(ports.len(8), 1);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_reports_presence_even_when_nothing_enqueued() {
        let net = SimNet::new(10);
        net.add_node(SimNode::new("n1"));
        net.place_contract("n1", "fresh.cct", "Total Ways to Sum", json!(7), 9, json!(6));
        let ports = PortRegistry::new();
        ports.open(8, 10);
        let mut tracker = EnqueueTracker::new();

        assert!(detect(&net, &ports, 8, &mut tracker, "n1").unwrap());
        assert_eq!(ports.len(8), 0);

        net.attempt_solution(&json!(6), "fresh.cct", "n1").unwrap();
        assert!(!detect(&net, &ports, 8, &mut tracker, "n1").unwrap());
    }
}
