//! Fleet reconnaissance and scheduling: topology scanning, per-node access
//! classification, the exec pool of compute donors, and the RAM-budgeted
//! worker scheduler.

pub mod classify;
pub mod cycle;
pub mod error;
pub mod pool;
pub mod scanner;
pub mod sched;

pub use classify::{classify, ClassifyContext, NodeRecord};
pub use cycle::FleetCycle;
pub use error::FleetError;
pub use pool::ExecPool;
pub use scanner::{scan, Discovery};
pub use sched::schedule;
