//! Per-task outcomes and the run report.

use crate::asset::{Artifact, AssetClass};
use crate::select::SelectError;
use crate::task::TaskId;
use crate::transform::TransformError;
use std::time::Duration;
use thiserror::Error;

/// Terminal state of a scheduled leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Completed, artifacts written
    Ok,
    /// Failed; see the attached failure
    Failed,
    /// Never started because an earlier series stage failed fatally
    Skipped,
}

/// Why a leaf failed.
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// A transform rejected its input. Recoverable: the task is reported
    /// and skipped, siblings keep running.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// Source selection failed
    #[error(transparent)]
    Select(#[from] SelectError),
    /// Filesystem operation failed
    #[error("{context}: {source}")]
    Io {
        /// What was being done
        context: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// The graph referenced a class with no registered pipeline
    #[error("no pipeline registered for asset class '{0}'")]
    Unregistered(AssetClass),
}

impl TaskFailure {
    /// Whether this failure kind is recoverable on its own.
    ///
    /// Only transform failures are; everything else is structural. The
    /// leaf's failure policy can still escalate a recoverable failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TaskFailure::Transform(_))
    }
}

/// The result of running one leaf.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Leaf identity
    pub id: TaskId,
    /// Terminal state
    pub status: TaskStatus,
    /// Artifacts written on success
    pub artifacts: Vec<Artifact>,
    /// Failure detail when status is `Failed`
    pub failure: Option<TaskFailure>,
    /// Whether the failure aborts the run
    pub fatal: bool,
    /// Wall time spent in the leaf
    pub elapsed: Duration,
}

impl TaskOutcome {
    /// Successful outcome.
    pub fn ok(id: TaskId, artifacts: Vec<Artifact>, elapsed: Duration) -> Self {
        Self { id, status: TaskStatus::Ok, artifacts, failure: None, fatal: false, elapsed }
    }

    /// Failed outcome; `fatal` decided by failure kind and leaf policy.
    pub fn failed(id: TaskId, failure: TaskFailure, fatal: bool, elapsed: Duration) -> Self {
        Self {
            id,
            status: TaskStatus::Failed,
            artifacts: Vec::new(),
            failure: Some(failure),
            fatal,
            elapsed,
        }
    }

    /// Outcome for a leaf that never ran.
    pub fn skipped(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Skipped,
            artifacts: Vec::new(),
            failure: None,
            fatal: false,
            elapsed: Duration::ZERO,
        }
    }
}

/// Everything that happened in one graph run.
#[derive(Debug)]
pub struct RunReport {
    /// Leaf outcomes in completion order
    pub outcomes: Vec<TaskOutcome>,
    /// Total wall time
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether any leaf failed fatally.
    pub fn is_fatal(&self) -> bool {
        self.outcomes.iter().any(|o| o.fatal)
    }

    /// Whether anything failed at all.
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == TaskStatus::Failed)
    }

    /// Failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| o.status == TaskStatus::Failed)
    }

    /// Every artifact written during the run.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.outcomes.iter().flat_map(|o| o.artifacts.iter())
    }

    /// Count of leaves in a given state.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
