//! Audit pipeline for slotwatch.
//!
//! Collects active and covered users across queues and reconciles the gap
//! into the daily record.

pub mod pipeline;
pub mod types;

pub use pipeline::{collect_queue, run_audit, QueueUsers};
pub use types::{AuditConfig, AuditReport, FailureSource, QueueFailure};
