//! Per-node access classification.
//!
//! A strictly ordered sequence of gates, short-circuiting on the first unmet
//! one; every field after the failed gate stays unset.

use serde::Serialize;
use tracing::debug;

use spider_contracts::{detect, EnqueueTracker, PortRegistry};
use spider_core::config::FleetConfig;
use spider_netenv::{AccessVector, NetEnv};

use crate::error::FleetError;
use crate::pool::ExecPool;
use crate::scanner::Discovery;
use crate::sched::schedule;

/// Classification outcome for one node in one scan cycle. Built fresh each
/// cycle and discarded afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub hostname: String,
    /// Distance from the scan root.
    pub depth: u32,
    /// Player-owned nodes short-circuit all further checks.
    pub is_owned: bool,
    pub meets_level_gate: Option<bool>,
    pub has_access: Option<bool>,
    pub backdoor_installed: Option<bool>,
    pub has_pending_contract: Option<bool>,
    /// Whether scheduling saturated the capacity budget for this node.
    pub work_dispatched: Option<bool>,
}

impl NodeRecord {
    fn new(hostname: &str, depth: u32) -> Self {
        Self {
            hostname: hostname.to_string(),
            depth,
            is_owned: false,
            meets_level_gate: None,
            has_access: None,
            backdoor_installed: None,
            has_pending_contract: None,
            work_dispatched: None,
        }
    }
}

/// Shared collaborators the classifier needs per call.
pub struct ClassifyContext<'a> {
    pub env: &'a dyn NetEnv,
    pub config: &'a FleetConfig,
    pub ports: &'a PortRegistry,
    pub port: u16,
}

/// Classify one discovered node, mutating the exec pool and triggering
/// scheduling and contract detection as side effects.
pub fn classify(
    ctx: &ClassifyContext<'_>,
    pool: &mut ExecPool,
    tracker: &mut EnqueueTracker,
    discovery: &Discovery,
) -> Result<NodeRecord, FleetError> {
    let mut record = NodeRecord::new(&discovery.hostname, discovery.depth);
    let facts = ctx.env.node(&discovery.hostname)?;

    if facts.is_owned {
        record.is_owned = true;
        return Ok(record);
    }

    if ctx.env.actor_skill_level() < facts.required_skill {
        record.meets_level_gate = Some(false);
        return Ok(record);
    }
    record.meets_level_gate = Some(true);

    if !facts.has_access && !gain_access(ctx.env, &discovery.hostname) {
        record.has_access = Some(false);
        return Ok(record);
    }
    record.has_access = Some(true);

    record.backdoor_installed = Some(facts.backdoor_installed);

    record.has_pending_contract = Some(detect(
        ctx.env,
        ctx.ports,
        ctx.port,
        tracker,
        &discovery.hostname,
    )?);

    if facts.max_value == 0.0 {
        // Capacity-only node: pooled as a compute donor instead of targeted.
        pool.register(&discovery.hostname);
        debug!(hostname = %discovery.hostname, "registered capacity-only node in exec pool");
    } else {
        record.work_dispatched = Some(schedule(ctx.env, pool, ctx.config, &discovery.hostname)?);
    }

    Ok(record)
}

/// Open the minimum number of required access vectors (individual failures
/// swallowed), then elevate.
fn gain_access(env: &dyn NetEnv, hostname: &str) -> bool {
    let Ok(mut facts) = env.node(hostname) else {
        return false;
    };
    for vector in AccessVector::ALL {
        if facts.open_vector_count >= facts.required_vector_count {
            break;
        }
        let _ = env.open_access_vector(vector, hostname);
        facts = match env.node(hostname) {
            Ok(facts) => facts,
            Err(_) => return false,
        };
    }
    if facts.open_vector_count < facts.required_vector_count {
        return false;
    }
    env.elevate(hostname).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spider_netenv::{SimNet, SimNode};

    const PAYLOAD: &str = "harvest.js";

    fn fleet_config() -> FleetConfig {
        FleetConfig {
            root_host: "home".to_string(),
            worker_payload: PAYLOAD.to_string(),
            capacity_budget: 1000.0,
            payload_cost_ceiling: 1_048_576.0,
            pool_prefixes: vec![],
            scan_interval_secs: 60,
        }
    }

    struct Fixture {
        net: SimNet,
        config: FleetConfig,
        ports: PortRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let net = SimNet::new(50);
            net.register_payload(PAYLOAD, 100.0);
            let ports = PortRegistry::new();
            ports.open(8, 16);
            Self {
                net,
                config: fleet_config(),
                ports,
            }
        }

        fn classify(
            &self,
            pool: &mut ExecPool,
            tracker: &mut EnqueueTracker,
            hostname: &str,
        ) -> NodeRecord {
            let ctx = ClassifyContext {
                env: &self.net,
                config: &self.config,
                ports: &self.ports,
                port: 8,
            };
            classify(
                &ctx,
                pool,
                tracker,
                &Discovery {
                    hostname: hostname.to_string(),
                    depth: 1,
                },
            )
            .unwrap()
        }
    }

    #[test]
    fn test_owned_node_short_circuits_everything() {
        let fx = Fixture::new();
        fx.net.add_node(SimNode::new("mine").owned().with_value(100.0));
        let mut pool = ExecPool::from_hosts(vec![]);
        let mut tracker = EnqueueTracker::new();

        let record = fx.classify(&mut pool, &mut tracker, "mine");
        assert!(record.is_owned);
        assert_eq!(record.meets_level_gate, None);
        assert_eq!(record.has_access, None);
        assert_eq!(record.backdoor_installed, None);
        assert_eq!(record.has_pending_contract, None);
        assert_eq!(record.work_dispatched, None);
    }

    #[test]
    fn test_level_gate_short_circuits_later_fields() {
        let fx = Fixture::new();
        fx.net.add_node(SimNode::new("hard").with_skill(999));
        let mut pool = ExecPool::from_hosts(vec![]);
        let mut tracker = EnqueueTracker::new();

        let record = fx.classify(&mut pool, &mut tracker, "hard");
        assert!(!record.is_owned);
        assert_eq!(record.meets_level_gate, Some(false));
        assert_eq!(record.has_access, None);
        assert_eq!(record.backdoor_installed, None);
        assert_eq!(record.has_pending_contract, None);
        assert_eq!(record.work_dispatched, None);
    }

    #[test]
    fn test_access_gate_failure_stops_classification() {
        let fx = Fixture::new();
        fx.net
            .add_node(SimNode::new("locked").with_required_vectors(3));
        for vector in [AccessVector::Ssh, AccessVector::Ftp, AccessVector::Smtp] {
            fx.net.fail_vector(vector, "locked");
        }
        let mut pool = ExecPool::from_hosts(vec![]);
        let mut tracker = EnqueueTracker::new();

        let record = fx.classify(&mut pool, &mut tracker, "locked");
        assert_eq!(record.meets_level_gate, Some(true));
        assert_eq!(record.has_access, Some(false));
        assert_eq!(record.backdoor_installed, None);
        assert_eq!(record.work_dispatched, None);
    }

    #[test]
    fn test_vector_failures_are_swallowed_individually() {
        let fx = Fixture::new();
        // Needs 2 vectors; ssh fails, but ftp and smtp still open.
        fx.net
            .add_node(SimNode::new("tough").with_required_vectors(2).with_backdoor());
        fx.net.fail_vector(AccessVector::Ssh, "tough");
        let mut pool = ExecPool::from_hosts(vec![]);
        let mut tracker = EnqueueTracker::new();

        let record = fx.classify(&mut pool, &mut tracker, "tough");
        assert_eq!(record.has_access, Some(true));
        assert_eq!(record.backdoor_installed, Some(true));
    }

    #[test]
    fn test_capacity_only_node_joins_pool_front() {
        let fx = Fixture::new();
        fx.net
            .add_node(SimNode::new("cap").accessible().with_capacity(64.0));
        let mut pool = ExecPool::from_hosts(vec!["home".to_string()]);
        let mut tracker = EnqueueTracker::new();

        let record = fx.classify(&mut pool, &mut tracker, "cap");
        assert_eq!(record.work_dispatched, None);
        let hosts: Vec<&str> = pool.iter().collect();
        assert_eq!(hosts, vec!["cap", "home"]);
    }

    #[test]
    fn test_value_node_gets_work_dispatched() {
        let fx = Fixture::new();
        fx.net.add_node(
            SimNode::new("donor")
                .accessible()
                .with_capacity(2000.0),
        );
        fx.net.add_node(
            SimNode::new("rich")
                .accessible()
                .with_value(10_000.0),
        );
        let mut pool = ExecPool::from_hosts(vec!["donor".to_string()]);
        let mut tracker = EnqueueTracker::new();

        let record = fx.classify(&mut pool, &mut tracker, "rich");
        // Budget 1000 fully packed onto the donor.
        assert_eq!(record.work_dispatched, Some(true));
        assert_eq!(fx.net.total_threads_of(PAYLOAD, "rich"), 10);
    }
}
