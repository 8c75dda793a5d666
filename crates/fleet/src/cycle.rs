//! The scan/schedule cycle: the long-lived process driving the scanner,
//! classifier, pool, and scheduler once per interval.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use spider_contracts::{EnqueueTracker, PortRegistry};
use spider_core::config::FleetConfig;
use spider_core::Shutdown;
use spider_netenv::NetEnv;

use crate::classify::{classify, ClassifyContext, NodeRecord};
use crate::error::FleetError;
use crate::pool::ExecPool;
use crate::scanner::scan;

pub struct FleetCycle {
    env: Arc<dyn NetEnv>,
    config: FleetConfig,
    ports: Arc<PortRegistry>,
    port: u16,
    pool: ExecPool,
    tracker: EnqueueTracker,
    scan_interval: Duration,
}

impl FleetCycle {
    /// Build the cycle, validating configuration. A worker payload with an
    /// unknown cost or one above the hard ceiling aborts startup.
    pub fn new(
        env: Arc<dyn NetEnv>,
        config: FleetConfig,
        ports: Arc<PortRegistry>,
        port: u16,
    ) -> Result<Self, FleetError> {
        let cost = env.payload_cost(&config.worker_payload);
        if cost <= 0.0 {
            return Err(FleetError::UnknownPayloadCost(config.worker_payload.clone()));
        }
        if cost > config.payload_cost_ceiling {
            return Err(FleetError::PayloadTooExpensive {
                payload: config.worker_payload.clone(),
                cost,
                ceiling: config.payload_cost_ceiling,
            });
        }
        let pool = ExecPool::seeded(env.as_ref(), &config.pool_prefixes, &config.root_host);
        info!(
            pool_size = pool.len(),
            root = %config.root_host,
            "exec pool seeded"
        );
        let scan_interval = Duration::from_secs(config.scan_interval_secs);
        Ok(Self {
            env,
            config,
            ports,
            port,
            pool,
            tracker: EnqueueTracker::new(),
            scan_interval,
        })
    }

    pub fn pool(&self) -> &ExecPool {
        &self.pool
    }

    /// One full cycle: scan from the root, classify every discovered node in
    /// discovery order. Per-node failures are logged and skipped; only a
    /// fatal queue error aborts the cycle.
    pub fn run_once(&mut self) -> Result<Vec<NodeRecord>, FleetError> {
        let discoveries = scan(self.env.as_ref(), &self.config.root_host);
        let mut records = Vec::with_capacity(discoveries.len());

        for discovery in &discoveries {
            let ctx = ClassifyContext {
                env: self.env.as_ref(),
                config: &self.config,
                ports: &self.ports,
                port: self.port,
            };
            match classify(&ctx, &mut self.pool, &mut self.tracker, discovery) {
                Ok(record) => {
                    report(&record);
                    records.push(record);
                }
                Err(FleetError::Queue(e)) => return Err(FleetError::Queue(e)),
                Err(e) => {
                    warn!(hostname = %discovery.hostname, error = %e, "classification failed, node skipped");
                }
            }
        }

        debug!(
            nodes = records.len(),
            pool_size = self.pool.len(),
            "scan cycle complete"
        );
        Ok(records)
    }

    /// Run until shutdown, with one suspension point per cycle.
    pub async fn run(mut self, shutdown: Arc<Shutdown>) {
        info!(root = %self.config.root_host, "fleet scan cycle started");
        while !shutdown.is_triggered() {
            if let Err(e) = self.run_once() {
                error!(error = %e, "fatal scan cycle error, terminating");
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.scan_interval) => {}
                _ = shutdown.wait() => break,
            }
        }
        info!("fleet scan cycle stopped");
    }
}

/// One severity-coded line per classified node, in discovery order.
fn report(record: &NodeRecord) {
    if record.is_owned {
        debug!(hostname = %record.hostname, depth = record.depth, "owned node");
    } else if record.meets_level_gate == Some(false) {
        info!(hostname = %record.hostname, depth = record.depth, "level gate unmet");
    } else if record.has_access == Some(false) {
        warn!(hostname = %record.hostname, depth = record.depth, "access denied");
    } else {
        info!(
            hostname = %record.hostname,
            depth = record.depth,
            contract = record.has_pending_contract.unwrap_or(false),
            backdoor = record.backdoor_installed.unwrap_or(false),
            dispatched = ?record.work_dispatched,
            "node classified"
        );
    }
}
