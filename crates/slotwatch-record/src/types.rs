use chrono::NaiveDate;
use serde::Serialize;
use slotwatch_lsf::{InvalidUserId, UserId, UserSet};

/// Unmanaged accounts observed on one calendar day.
///
/// Only ever grows within its day; a new date starts a new, empty record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAccountRecord {
    /// Day the record belongs to.
    pub date: NaiveDate,

    /// Users seen unmanaged at least once that day.
    pub users: UserSet,
}

impl DailyAccountRecord {
    /// Empty record for a day.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            users: UserSet::new(),
        }
    }

    /// Add users, returning those that were not already recorded.
    pub fn merge(&mut self, users: &UserSet) -> UserSet {
        let added: UserSet = users.difference(&self.users).cloned().collect();
        self.users.extend(added.iter().cloned());
        added
    }

    /// File contents: one user per line, sorted, newline-terminated.
    pub fn to_text(&self) -> String {
        self.users
            .iter()
            .map(|user| format!("{user}\n"))
            .collect()
    }
}

/// Users active in monitored queues but not covered by any matching limit.
pub fn missing_users(active: &UserSet, covered: &UserSet) -> UserSet {
    active.difference(covered).cloned().collect()
}

/// Fold the uncovered users into a record.
///
/// `reconcile(a, c, reconcile(a, c, r)) == reconcile(a, c, r)`.
pub fn reconcile(
    active: &UserSet,
    covered: &UserSet,
    mut record: DailyAccountRecord,
) -> DailyAccountRecord {
    record.merge(&missing_users(active, covered));
    record
}

/// Helper for building sets from string slices.
pub fn user_set<'a>(
    ids: impl IntoIterator<Item = &'a str>,
) -> Result<UserSet, InvalidUserId> {
    ids.into_iter().map(UserId::new).collect()
}
