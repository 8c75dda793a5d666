//! The contract dispatch consumer.
//!
//! Long-lived loop, independent of the scan cycle: drain the port to empty,
//! resolve each job's live type and data, call the solver, submit the
//! answer, and keep the failure artifacts straight. Per-job failures never
//! abort the loop; only a fatal port-registry error terminates it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use spider_core::config::SolverConfig;
use spider_core::Shutdown;
use spider_netenv::NetEnv;

use crate::artifact::ErrorRecord;
use crate::error::{QueueError, SolveError};
use crate::job::ContractJob;
use crate::queue::PortRegistry;
use crate::solver::ContractSolver;

/// How a single job ended. Used for logging and assertions; the loop itself
/// treats every outcome the same way (move on to the next job).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Correct answer submitted; any prior artifact cleared.
    Solved,
    /// Runtime rejected the answer; artifact written.
    WrongAnswer,
    /// Solver returned a non-success status; artifact written.
    SolverRejected,
    /// Solver response was not parseable; artifact written.
    Unparseable,
    /// Transport failure; dropped, rediscovered next scan cycle.
    Transient,
    /// Contract no longer exists; dropped silently.
    Stale,
}

pub struct DispatchConsumer<S: ContractSolver> {
    env: Arc<dyn NetEnv>,
    solver: S,
    ports: Arc<PortRegistry>,
    port: u16,
    poll_interval: Duration,
    transport_warn_threshold: u32,
    consecutive_transport_failures: u32,
}

impl<S: ContractSolver> DispatchConsumer<S> {
    pub fn new(
        env: Arc<dyn NetEnv>,
        solver: S,
        ports: Arc<PortRegistry>,
        port: u16,
        config: &SolverConfig,
    ) -> Self {
        Self {
            env,
            solver,
            ports,
            port,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            transport_warn_threshold: config.transport_warn_threshold,
            consecutive_transport_failures: 0,
        }
    }

    /// Process one job end to end.
    pub async fn process_job(&mut self, job: &ContractJob) -> JobOutcome {
        // Resolve live metadata; a missing contract was solved or expired in
        // the meantime and is not an error.
        let contract_type = match self.env.contract_type(&job.filename, &job.hostname) {
            Ok(t) => t,
            Err(_) => {
                debug!(filename = %job.filename, hostname = %job.hostname, "contract gone, dropping job");
                return JobOutcome::Stale;
            }
        };
        let data = match self.env.contract_data(&job.filename, &job.hostname) {
            Ok(d) => d,
            Err(_) => {
                debug!(filename = %job.filename, hostname = %job.hostname, "contract gone, dropping job");
                return JobOutcome::Stale;
            }
        };

        let answer = match self.solver.solve(&contract_type, &data).await {
            Ok(answer) => answer,
            Err(SolveError::Transport(e)) => {
                self.consecutive_transport_failures += 1;
                if self.consecutive_transport_failures == self.transport_warn_threshold {
                    error!(
                        failures = self.consecutive_transport_failures,
                        "solver unreachable for consecutive jobs, dropping until it recovers"
                    );
                } else {
                    warn!(filename = %job.filename, error = %e, "solver transport failure, job dropped");
                }
                return JobOutcome::Transient;
            }
            Err(SolveError::Status { status, body }) => {
                self.consecutive_transport_failures = 0;
                warn!(filename = %job.filename, status, "solver rejected contract");
                self.persist(job, ErrorRecord::solver_status(&contract_type, &data, status, body));
                return JobOutcome::SolverRejected;
            }
            Err(SolveError::Parse { error: e, raw }) => {
                self.consecutive_transport_failures = 0;
                warn!(filename = %job.filename, error = %e, "unparseable solver response");
                self.persist(job, ErrorRecord::unparseable(&contract_type, &data, e, raw));
                return JobOutcome::Unparseable;
            }
        };
        self.consecutive_transport_failures = 0;

        match self.env.attempt_solution(&answer, &job.filename, &job.hostname) {
            Ok(true) => {
                match ErrorRecord::clear(self.env.as_ref(), job) {
                    Ok(true) => debug!(filename = %job.filename, "cleared prior error artifact"),
                    Ok(false) => {}
                    Err(e) => warn!(filename = %job.filename, error = %e, "failed to clear error artifact"),
                }
                info!(filename = %job.filename, hostname = %job.hostname, "solved contract");
                JobOutcome::Solved
            }
            Ok(false) => {
                warn!(filename = %job.filename, hostname = %job.hostname, "wrong answer for contract");
                self.persist(job, ErrorRecord::wrong_answer(&contract_type, &data, answer));
                JobOutcome::WrongAnswer
            }
            Err(_) => {
                debug!(filename = %job.filename, hostname = %job.hostname, "contract vanished before submission");
                JobOutcome::Stale
            }
        }
    }

    fn persist(&self, job: &ContractJob, record: ErrorRecord) {
        if let Err(e) = record.persist(self.env.as_ref(), job) {
            warn!(filename = %job.filename, error = %e, "failed to persist error artifact");
        }
    }

    /// Drain the port completely, processing each job. Returns how many jobs
    /// were dequeued.
    pub async fn drain_once(&mut self) -> Result<usize, QueueError> {
        let mut processed = 0;
        while let Some(payload) = self.ports.try_dequeue(self.port)? {
            let job = match ContractJob::from_wire(&payload) {
                Ok(job) => job,
                Err(e) => {
                    warn!(error = %e, "malformed port payload, dropped");
                    continue;
                }
            };
            self.process_job(&job).await;
            processed += 1;
        }
        Ok(processed)
    }

    /// Run until shutdown. A fatal queue access error terminates the loop.
    pub async fn run(mut self, shutdown: Arc<Shutdown>) {
        info!(port = self.port, "contract dispatch consumer started");
        while !shutdown.is_triggered() {
            match self.drain_once().await {
                Ok(n) if n > 0 => debug!(jobs = n, "drained contract port"),
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "fatal port access error, consumer terminating");
                    return;
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.wait() => break,
            }
        }
        info!("contract dispatch consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use spider_netenv::{SimNet, SimNode};

    /// Solver returning scripted outcomes in order; counts calls.
    struct MockSolver {
        responses: Mutex<VecDeque<Result<Value, SolveError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl MockSolver {
        fn scripted(responses: Vec<Result<Value, SolveError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    responses: Mutex::new(responses.into()),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl ContractSolver for MockSolver {
        async fn solve(&self, _contract_type: &str, _data: &Value) -> Result<Value, SolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SolveError::Transport("script exhausted".into())))
        }
    }

    fn consumer_fixture(
        responses: Vec<Result<Value, SolveError>>,
    ) -> (Arc<SimNet>, DispatchConsumer<MockSolver>, Arc<AtomicUsize>) {
        let net = Arc::new(SimNet::new(10));
        net.add_node(SimNode::new("n1").accessible());
        let ports = Arc::new(PortRegistry::new());
        ports.open(8, 16);
        let (solver, calls) = MockSolver::scripted(responses);
        let config = SolverConfig {
            base_url: "http://localhost:8080".into(),
            poll_interval_secs: 1,
            transport_warn_threshold: 3,
        };
        let consumer = DispatchConsumer::new(net.clone(), solver, ports, 8, &config);
        (net, consumer, calls)
    }

    #[tokio::test]
    async fn test_stale_job_makes_no_solver_calls_and_no_artifact() {
        let (net, mut consumer, calls) = consumer_fixture(vec![Ok(json!(42))]);
        let job = ContractJob::new("gone.cct", "n1");

        assert_eq!(consumer.process_job(&job).await, JobOutcome::Stale);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(ErrorRecord::load(net.as_ref(), &job).is_none());
    }

    #[tokio::test]
    async fn test_wrong_then_right_answer_artifact_lifecycle() {
        let (net, mut consumer, _calls) =
            consumer_fixture(vec![Ok(json!([2])), Ok(json!([1]))]);
        net.place_contract("n1", "c.cct", "Spiralize Matrix", json!([[1]]), 9, json!([1]));
        let job = ContractJob::new("c.cct", "n1");

        assert_eq!(consumer.process_job(&job).await, JobOutcome::WrongAnswer);
        let record = ErrorRecord::load(net.as_ref(), &job).unwrap();
        assert_eq!(record.reason, "wrong answer");
        assert_eq!(record.answer, Some(json!([2])));

        assert_eq!(consumer.process_job(&job).await, JobOutcome::Solved);
        assert!(ErrorRecord::load(net.as_ref(), &job).is_none());
        assert!(!net.contract_exists("n1", "c.cct"));
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_no_artifact() {
        let (net, mut consumer, _calls) =
            consumer_fixture(vec![Err(SolveError::Transport("refused".into()))]);
        net.place_contract("n1", "c.cct", "Total Ways to Sum", json!(7), 9, json!(6));
        let job = ContractJob::new("c.cct", "n1");

        assert_eq!(consumer.process_job(&job).await, JobOutcome::Transient);
        assert!(ErrorRecord::load(net.as_ref(), &job).is_none());
        // The contract is untouched and will be rediscovered.
        assert!(net.contract_exists("n1", "c.cct"));
    }

    #[tokio::test]
    async fn test_solver_status_writes_permanent_artifact() {
        let (net, mut consumer, _calls) = consumer_fixture(vec![Err(SolveError::Status {
            status: 400,
            body: "Unknown coding contract".into(),
        })]);
        net.place_contract("n1", "c.cct", "Mystery Type", json!(null), 9, json!(0));
        let job = ContractJob::new("c.cct", "n1");

        assert_eq!(consumer.process_job(&job).await, JobOutcome::SolverRejected);
        let record = ErrorRecord::load(net.as_ref(), &job).unwrap();
        assert_eq!(record.status_code, Some(400));
        assert_eq!(record.response_body.as_deref(), Some("Unknown coding contract"));
    }

    #[tokio::test]
    async fn test_unparseable_response_writes_permanent_artifact() {
        let (net, mut consumer, _calls) = consumer_fixture(vec![Err(SolveError::Parse {
            error: "expected value".into(),
            raw: "<html>".into(),
        })]);
        net.place_contract("n1", "c.cct", "Total Ways to Sum", json!(7), 9, json!(6));
        let job = ContractJob::new("c.cct", "n1");

        assert_eq!(consumer.process_job(&job).await, JobOutcome::Unparseable);
        let record = ErrorRecord::load(net.as_ref(), &job).unwrap();
        assert_eq!(record.reason, "unparseable response");
        assert_eq!(record.raw_body.as_deref(), Some("<html>"));
    }

    #[tokio::test]
    async fn test_drain_processes_jobs_and_skips_garbage() {
        let (net, mut consumer, calls) = consumer_fixture(vec![Ok(json!(6)), Ok(json!(6))]);
        net.place_contract("n1", "a.cct", "Total Ways to Sum", json!(7), 9, json!(6));
        net.place_contract("n1", "b.cct", "Total Ways to Sum", json!(7), 9, json!(6));

        let ports = consumer.ports.clone();
        ports
            .try_enqueue(8, &ContractJob::new("a.cct", "n1").to_wire().unwrap())
            .unwrap();
        ports.try_enqueue(8, "not json").unwrap();
        ports
            .try_enqueue(8, &ContractJob::new("b.cct", "n1").to_wire().unwrap())
            .unwrap();

        let processed = consumer.drain_once().await.unwrap();
        assert_eq!(processed, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(ports.is_empty(8));
        assert!(!net.contract_exists("n1", "a.cct"));
        assert!(!net.contract_exists("n1", "b.cct"));
    }
}
