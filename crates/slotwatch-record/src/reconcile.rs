//! Read-modify-write of the daily account record.

use crate::store::{RecordError, RecordStore};
use crate::types::{missing_users, DailyAccountRecord};
use chrono::NaiveDate;
use serde::Serialize;
use slotwatch_lsf::UserSet;

/// What a reconciliation did to the day's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Every active user is covered. The record was not read or written.
    NothingMissing,
    /// Missing users were all recorded earlier today. Nothing written.
    AlreadyRecorded { missing: UserSet, total: usize },
    /// New users were appended and the record rewritten.
    Updated {
        missing: UserSet,
        added: UserSet,
        total: usize,
    },
}

impl ReconcileOutcome {
    /// Users missing coverage in this run.
    pub fn missing(&self) -> Option<&UserSet> {
        match self {
            ReconcileOutcome::NothingMissing => None,
            ReconcileOutcome::AlreadyRecorded { missing, .. }
            | ReconcileOutcome::Updated { missing, .. } => Some(missing),
        }
    }
}

/// Owns the record store and merges each run's gaps into it.
pub struct Reconciler {
    store: RecordStore,
}

impl Reconciler {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Merge `active \ covered` into the record for `date`.
    ///
    /// No file is created when nothing is missing, and an existing file is
    /// only rewritten when it gains users. A record that cannot be read
    /// aborts the merge rather than overwrite what it holds.
    pub fn reconcile(
        &self,
        date: NaiveDate,
        active: &UserSet,
        covered: &UserSet,
    ) -> Result<ReconcileOutcome, RecordError> {
        let missing = missing_users(active, covered);
        if missing.is_empty() {
            tracing::debug!("All {} active users are covered", active.len());
            return Ok(ReconcileOutcome::NothingMissing);
        }

        let mut record = self
            .store
            .load(date)?
            .unwrap_or_else(|| DailyAccountRecord::new(date));
        let added = record.merge(&missing);
        let total = record.users.len();

        if added.is_empty() {
            return Ok(ReconcileOutcome::AlreadyRecorded { missing, total });
        }

        self.store.save(&record)?;
        tracing::info!(
            "Recorded {} new unmanaged accounts ({} today) in {}",
            added.len(),
            total,
            self.store.path_for(date)
        );
        Ok(ReconcileOutcome::Updated {
            missing,
            added,
            total,
        })
    }
}
