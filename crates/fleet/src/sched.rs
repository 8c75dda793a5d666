//! RAM-budgeted worker scheduler.
//!
//! Greedy first-fit allocation of worker payload threads across the exec
//! pool, capped by a global per-target budget. Re-entrant: already-running
//! worker processes for the target are counted before anything new is
//! dispatched, so repeated calls converge instead of stacking work.

use tracing::{debug, warn};

use spider_core::config::FleetConfig;
use spider_netenv::NetEnv;

use crate::error::FleetError;
use crate::pool::ExecPool;

/// Upper bound on disambiguator retries when a launch collides with an
/// existing process carrying the same argument set.
const MAX_LAUNCH_ATTEMPTS: u32 = 16;

/// Allocate worker threads against `target` across the pool, then fall back
/// to the target's own free capacity. Returns whether the budget is
/// saturated (no room for even one more thread this cycle).
///
/// A member whose staging or launch fails contributes zero threads; the next
/// cycle recomputes committed capacity and retries naturally.
pub fn schedule(
    env: &dyn NetEnv,
    pool: &ExecPool,
    config: &FleetConfig,
    target: &str,
) -> Result<bool, FleetError> {
    let payload = config.worker_payload.as_str();
    let cost = env.payload_cost(payload);
    if cost <= 0.0 {
        return Err(FleetError::UnknownPayloadCost(payload.to_string()));
    }
    let budget = config.capacity_budget;

    // Capacity already committed to this target, across the whole pool.
    let running_threads: u32 = pool
        .iter()
        .flat_map(|member| env.list_processes(member))
        .filter(|p| p.payload == payload && p.args.first().map(String::as_str) == Some(target))
        .map(|p| p.threads)
        .sum();
    let mut used = cost * running_threads as f64;

    for member in pool.iter() {
        if used > budget - cost {
            break;
        }
        let facts = match env.node(member) {
            Ok(facts) => facts,
            Err(e) => {
                warn!(member, error = %e, "pool member unavailable, skipped");
                continue;
            }
        };
        let threads = ((budget - used).min(facts.free_capacity()) / cost).floor() as u32;
        if threads == 0 {
            continue;
        }
        if !env.file_exists(payload, member) {
            if let Err(e) = env.stage(payload, member) {
                warn!(member, error = %e, "failed to stage worker payload, skipped");
                continue;
            }
        }
        if launch_disambiguated(env, payload, member, threads, target).is_none() {
            warn!(member, target, threads, "worker launch failed, skipped");
            continue;
        }
        debug!(member, target, threads, "dispatched worker threads");
        used += threads as f64 * cost;
    }

    // Self-hosting fallback: the target's own idle capacity is free and does
    // not count against the donated budget.
    if let Ok(facts) = env.node(target) {
        let free = facts.free_capacity();
        if free >= cost {
            let threads = (free / cost).floor() as u32;
            let staged = env.file_exists(payload, target)
                || env
                    .stage(payload, target)
                    .map_err(|e| warn!(target, error = %e, "failed to stage self-host payload"))
                    .is_ok();
            if staged && launch_disambiguated(env, payload, target, threads, target).is_some() {
                debug!(target, threads, "dispatched self-hosted worker threads");
            }
        }
    }

    Ok(used > budget - cost)
}

/// Launch with an incrementing run index until the argument set no longer
/// collides with an existing process.
fn launch_disambiguated(
    env: &dyn NetEnv,
    payload: &str,
    hostname: &str,
    threads: u32,
    target: &str,
) -> Option<u32> {
    for run_index in 0..MAX_LAUNCH_ATTEMPTS {
        let args = vec![target.to_string(), run_index.to_string()];
        let pid = env.launch(payload, hostname, threads, &args);
        if pid != 0 {
            return Some(pid);
        }
    }
    None
}
