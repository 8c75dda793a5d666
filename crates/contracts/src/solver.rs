//! HTTP client for the external solver service.

use async_trait::async_trait;
use serde_json::Value;

use spider_core::config::SolverConfig;

use crate::error::SolveError;

/// Seam for the external solver, so the consumer can be tested against a
/// scripted implementation.
#[async_trait]
pub trait ContractSolver: Send + Sync {
    /// Solve a contract of the given type. The returned value's shape must
    /// match the contract type's expected answer shape.
    async fn solve(&self, contract_type: &str, data: &Value) -> Result<Value, SolveError>;
}

/// Solver backed by `GET {base_url}/solve_contract?c_type=..&data=..`.
pub struct HttpSolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSolver {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ContractSolver for HttpSolver {
    async fn solve(&self, contract_type: &str, data: &Value) -> Result<Value, SolveError> {
        let url = format!("{}/solve_contract", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("c_type", contract_type), ("data", &data.to_string())])
            .send()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SolveError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(SolveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| SolveError::Parse {
            error: e.to_string(),
            raw: body,
        })
    }
}
