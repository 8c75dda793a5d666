//! Durable failure artifacts.
//!
//! Each permanently failed job leaves one JSON file on the job's origin
//! node, deterministically named from the contract filename. A later success
//! deletes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use spider_netenv::{EnvError, NetEnv};

use crate::job::ContractJob;

/// Artifact filename for a contract file.
pub fn artifact_name(filename: &str) -> String {
    format!("{filename}.error.json")
}

/// A persisted record of why a contract submission failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub contract_type: String,
    pub data: Value,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorRecord {
    fn base(contract_type: &str, data: &Value, reason: &str) -> Self {
        Self {
            contract_type: contract_type.to_string(),
            data: data.clone(),
            reason: reason.to_string(),
            status_code: None,
            response_body: None,
            parse_error: None,
            raw_body: None,
            answer: None,
            recorded_at: Utc::now(),
        }
    }

    /// Solver responded with a non-success status.
    pub fn solver_status(contract_type: &str, data: &Value, status: u16, body: String) -> Self {
        let mut record = Self::base(contract_type, data, "solver status");
        record.status_code = Some(status);
        record.response_body = Some(body);
        record
    }

    /// Solver responded but the body was not parseable as an answer.
    pub fn unparseable(contract_type: &str, data: &Value, error: String, raw: String) -> Self {
        let mut record = Self::base(contract_type, data, "unparseable response");
        record.parse_error = Some(error);
        record.raw_body = Some(raw);
        record
    }

    /// The contract runtime rejected the submitted answer.
    pub fn wrong_answer(contract_type: &str, data: &Value, answer: Value) -> Self {
        let mut record = Self::base(contract_type, data, "wrong answer");
        record.answer = Some(answer);
        record
    }

    /// Write (or overwrite) the artifact on the job's origin node.
    pub fn persist(&self, env: &dyn NetEnv, job: &ContractJob) -> Result<(), EnvError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| EnvError::Io(e.to_string()))?;
        env.write_file(&artifact_name(&job.filename), &job.hostname, &json)
    }

    /// Delete the artifact for a job; returns whether one existed.
    pub fn clear(env: &dyn NetEnv, job: &ContractJob) -> Result<bool, EnvError> {
        env.remove_file(&artifact_name(&job.filename), &job.hostname)
    }

    /// Read back the artifact for a job, if present and well-formed.
    pub fn load(env: &dyn NetEnv, job: &ContractJob) -> Option<Self> {
        let contents = env.read_file(&artifact_name(&job.filename), &job.hostname)?;
        serde_json::from_str(&contents).ok()
    }
}
