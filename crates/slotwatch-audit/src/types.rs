//! Audit configuration and report types.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use slotwatch_lsf::{LineSelector, UserSet};
use slotwatch_record::ReconcileOutcome;

/// Resolved inputs for one audit run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Queues to audit
    pub queues: Vec<String>,
    /// Only job lines matching this pattern count as active users
    pub user_filter: Option<Regex>,
    /// Limit names must start with this to count as coverage
    pub limit_prefix: String,
    /// Lines to drop from the top of each job listing
    pub header_lines: usize,
    /// How a user is read from a job line
    pub selector: LineSelector,
}

impl AuditConfig {
    pub fn new(queues: Vec<String>) -> Self {
        Self {
            queues,
            user_filter: None,
            limit_prefix: String::new(),
            header_lines: 1,
            selector: LineSelector::default(),
        }
    }
}

/// Which gateway call failed for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    ActiveUsers,
    ConsumeLimits,
}

/// A queue whose scheduler output could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueFailure {
    pub queue: String,
    pub source: FailureSource,
    pub message: String,
}

/// Result of one audit run.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub date: NaiveDate,
    pub queues: Vec<String>,
    /// Users with jobs in any audited queue
    pub active: UserSet,
    /// Users named by a matching PER_USER limit in any audited queue
    pub covered: UserSet,
    /// Per-queue failures that were skipped
    pub failures: Vec<QueueFailure>,
    pub outcome: ReconcileOutcome,
}

impl AuditReport {
    /// Users active but not covered in this run.
    pub fn missing(&self) -> UserSet {
        self.outcome.missing().cloned().unwrap_or_default()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
