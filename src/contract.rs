//! Wrapper contract: the request/result JSON protocol generated entry-point
//! scripts must implement.
//!
//! This is a protocol definition, not a stateful component. The generator
//! never executes it; generated scripts serialize these shapes at their own
//! later invocation, and the orchestrator validates what comes back.
//!
//! Execution is three-state: `ok` and `error` are terminal, `pending` is
//! not. A `pending` result hands the orchestrator a follow-up action
//! (typically spawning a sub-task with a bounded timeout) whose result must
//! be resubmitted before the operation can complete. `pending` is not a
//! failure.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contract revision embedded in generated scripts.
pub const CONTRACT_VERSION: &str = "1";

/// Default sub-task timeout when `runTimeoutSeconds` is omitted.
pub const DEFAULT_RUN_TIMEOUT_SECS: u32 = 300;

/// What a generated entry-point script accepts on stdin / `input/request.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WrapperRequest {
    pub command: String,
    #[serde(default)]
    pub args: serde_json::Map<String, Value>,
    pub project_dir: String,
}

/// What a generated entry-point script emits. Tagged on `status`, payload
/// fields scoped per tag, so shapes like `pending` with `artifacts` are
/// unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WrapperResult {
    Ok {
        artifacts: Vec<Artifact>,
        summary: String,
    },
    Error {
        message: String,
    },
    Pending {
        action: PendingAction,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

/// The follow-up the orchestrator must perform before resubmitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingAction {
    pub tool: String,
    pub params: ActionParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionParams {
    pub task: String,
    pub label: String,
    #[serde(
        rename = "runTimeoutSeconds",
        default = "default_run_timeout"
    )]
    pub run_timeout_seconds: u32,
}

fn default_run_timeout() -> u32 {
    DEFAULT_RUN_TIMEOUT_SECS
}

/// Validate an untrusted result object against the contract.
///
/// Rejects a missing or unknown `status`, payload fields of the wrong shape
/// (e.g. `ok` with a non-array `artifacts`), and non-positive timeouts.
pub fn validate_result(value: &Value) -> Result<WrapperResult> {
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .context("Result object is missing the `status` field")?;

    if !matches!(status, "ok" | "error" | "pending") {
        bail!("Unknown result status: {}", status);
    }

    let result: WrapperResult = serde_json::from_value(value.clone())
        .with_context(|| format!("Malformed `{}` result object", status))?;

    if let WrapperResult::Pending { action } = &result {
        if action.params.run_timeout_seconds == 0 {
            bail!("runTimeoutSeconds must be a positive integer");
        }
    }

    Ok(result)
}

/// Validate an untrusted request object against the contract.
pub fn validate_request(value: &Value) -> Result<WrapperRequest> {
    serde_json::from_value(value.clone()).context("Malformed request object")
}
