//! Contract dispatch pipeline: port queue, detection, solver client, and the
//! consumer loop with durable failure bookkeeping.

pub mod artifact;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod job;
pub mod queue;
pub mod solver;

pub use artifact::{artifact_name, ErrorRecord};
pub use detect::{detect, EnqueueTracker};
pub use dispatch::{DispatchConsumer, JobOutcome};
pub use error::{QueueError, SolveError};
pub use job::ContractJob;
pub use queue::PortRegistry;
pub use solver::{ContractSolver, HttpSolver};
