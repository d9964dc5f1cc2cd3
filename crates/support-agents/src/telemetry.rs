//! Append-only audit log of pipeline runs.
//!
//! Each line of the log file is one [`AuditRecord`] (JSONL), so the file can
//! be tailed or streamed into other tools. Write failures are logged and
//! never fail the request that produced the record.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use coordination::{CoercionPath, RequestFailure, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::prompts::PROMPT_VERSION;

/// How one stage of a run produced its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    pub stage: Stage,
    pub agent: String,
    pub path: CoercionPath,
    /// Coercion problems encountered, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    Ok { output: Value },
    Failed { failure: RequestFailure },
}

/// One audited operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Operation name (`triage`, `resolution`, `monitoring`, `pipeline`, `agent`).
    pub operation: String,
    pub prompt_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageTrace>,
    pub outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn new(run_id: Uuid, operation: &str, stages: Vec<StageTrace>, outcome: AuditOutcome) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            operation: operation.to_string(),
            prompt_version: PROMPT_VERSION.to_string(),
            stages,
            outcome,
        }
    }
}

/// JSONL audit sink.
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_append(&self, record: &AuditRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize audit record")?;
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log {}", self.path.display()))?;
        writeln!(file, "{json}").context("Failed to append audit record")?;
        Ok(())
    }

    /// Append a record. Failures are logged, not returned.
    pub fn append(&self, record: &AuditRecord) {
        match self.try_append(record) {
            Ok(()) => info!(
                run_id = %record.run_id,
                operation = %record.operation,
                path = %self.path.display(),
                "Appended audit record"
            ),
            Err(e) => warn!(run_id = %record.run_id, "Audit log write failed: {e:#}"),
        }
    }

    /// Read every record back, skipping lines that do not parse.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read audit log {}", self.path.display()))
            }
        };
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}
