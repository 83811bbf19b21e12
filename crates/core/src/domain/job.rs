// Batch Job Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (assigned by the store on insert)
pub type JobId = i64;

/// Which path created the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Sync,
    Async,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Sync => write!(f, "sync"),
            JobKind::Async => write!(f, "async"),
        }
    }
}

impl FromStr for JobKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sync" => Ok(JobKind::Sync),
            "async" => Ok(JobKind::Async),
            other => Err(DomainError::UnknownKind(other.to_string())),
        }
    }
}

/// Job lifecycle status
///
/// `Running` is entered when the header row is inserted. `Finished` and
/// `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Running,
    Finished,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Finished => write!(f, "Finished"),
            JobStatus::Error => write!(f, "Error"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Running" => Ok(JobStatus::Running),
            "Finished" => Ok(JobStatus::Finished),
            "Error" => Ok(JobStatus::Error),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// One unit of a batch, immutable once inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildItem {
    pub id: i64,
    pub parent_id: JobId,
    pub position: i64,
}

/// Batch header plus its child items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub quantity: i64,
    pub status: JobStatus,
    pub started_at: i64, // unix seconds
    pub ended_at: Option<i64>,
    #[serde(default)]
    pub items: Vec<ChildItem>,
}

impl Job {
    /// Transition Running -> Finished, stamping `ended_at`
    pub fn finish(&mut self, now_secs: i64) -> Result<()> {
        self.transition(JobStatus::Finished, now_secs)
    }

    /// Transition Running -> Error, stamping `ended_at`
    pub fn fail(&mut self, now_secs: i64) -> Result<()> {
        self.transition(JobStatus::Error, now_secs)
    }

    fn transition(&mut self, to: JobStatus, now_secs: i64) -> Result<()> {
        if self.status != JobStatus::Running {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.ended_at = Some(now_secs);
        Ok(())
    }

    /// Positions of the attached items, in stored order
    pub fn positions(&self) -> Vec<i64> {
        self.items.iter().map(|item| item.position).collect()
    }
}

/// Reject negative batch sizes before any store work
pub fn validate_quantity(quantity: i64) -> Result<()> {
    if quantity < 0 {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    Ok(())
}
