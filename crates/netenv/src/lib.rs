//! External-environment boundary for the spider daemon.
//!
//! Everything the fleet scheduler and contract pipeline need from the
//! outside world — node adjacency, access primitives, process control, the
//! contract runtime, and per-node file storage — goes through the [`NetEnv`]
//! trait. [`SimNet`] is the in-memory implementation used by the daemon
//! harness and the test suite.

pub mod env;
pub mod error;
pub mod sim;
pub mod types;

pub use env::NetEnv;
pub use error::EnvError;
pub use sim::{SimNet, SimNode};
pub use types::{AccessVector, NodeFacts, ProcessInfo};
