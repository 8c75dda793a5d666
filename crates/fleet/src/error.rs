//! Fleet error types.

use thiserror::Error;

use spider_contracts::QueueError;
use spider_netenv::EnvError;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("worker payload {payload} costs {cost} per thread, above the {ceiling} ceiling")]
    PayloadTooExpensive {
        payload: String,
        cost: f64,
        ceiling: f64,
    },

    #[error("worker payload {0} has no registered cost")]
    UnknownPayloadCost(String),
}
