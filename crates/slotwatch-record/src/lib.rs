//! Daily account record for slotwatch.
//!
//! Stores the unmanaged accounts seen each day and merges new findings in.

pub mod reconcile;
pub mod store;
pub mod types;

pub use reconcile::{ReconcileOutcome, Reconciler};
pub use store::{RecordError, RecordStore, DEFAULT_RECORD_PREFIX};
pub use types::{missing_users, reconcile, user_set, DailyAccountRecord};
