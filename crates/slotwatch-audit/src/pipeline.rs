//! Per-queue collection and reconciliation.

use crate::types::{AuditConfig, AuditReport, FailureSource, QueueFailure};
use chrono::NaiveDate;
use slotwatch_lsf::{extract_users, parse_limit_blocks, QueueGateway, UserSet};
use slotwatch_record::{RecordError, Reconciler};

/// Users found for a single queue.
///
/// `None` means the listing for that source could not be fetched.
#[derive(Debug, Clone, Default)]
pub struct QueueUsers {
    pub active: Option<UserSet>,
    pub covered: Option<UserSet>,
    pub failures: Vec<QueueFailure>,
}

/// Fetch and parse both listings for one queue.
///
/// Gateway errors are logged and returned as failures, never propagated.
pub async fn collect_queue<G: QueueGateway>(
    gateway: &G,
    queue: &str,
    config: &AuditConfig,
) -> QueueUsers {
    let (listing, limits) = tokio::join!(
        gateway.list_active_users(queue),
        gateway.list_consume_limits(queue)
    );

    let mut users = QueueUsers::default();

    match listing {
        Ok(raw) => {
            users.active = Some(extract_users(
                &raw,
                config.header_lines,
                config.selector,
                config.user_filter.as_ref(),
            ));
        }
        Err(e) => {
            tracing::warn!("Skipping active users of queue {}: bjobs failed: {}", queue, e);
            users.failures.push(QueueFailure {
                queue: queue.to_string(),
                source: FailureSource::ActiveUsers,
                message: e.to_string(),
            });
        }
    }

    match limits {
        Ok(raw) => users.covered = Some(parse_limit_blocks(&raw, &config.limit_prefix)),
        Err(e) => {
            tracing::warn!("Skipping limits of queue {}: blimits failed: {}", queue, e);
            users.failures.push(QueueFailure {
                queue: queue.to_string(),
                source: FailureSource::ConsumeLimits,
                message: e.to_string(),
            });
        }
    }

    tracing::debug!(
        "Queue {}: {:?} active, {:?} covered",
        queue,
        users.active.as_ref().map(UserSet::len),
        users.covered.as_ref().map(UserSet::len)
    );
    users
}

/// Audit every configured queue and merge the uncovered users into the
/// record for `date`.
///
/// A failed gateway call drops only that queue's contribution from that
/// source; the queue's other listing still counts. Only record errors abort
/// the run.
pub async fn run_audit<G: QueueGateway>(
    gateway: &G,
    config: &AuditConfig,
    reconciler: &Reconciler,
    date: NaiveDate,
) -> Result<AuditReport, RecordError> {
    let mut active = UserSet::new();
    let mut covered = UserSet::new();
    let mut failures = Vec::new();

    for queue in &config.queues {
        let users = collect_queue(gateway, queue, config).await;
        active.extend(users.active.into_iter().flatten());
        covered.extend(users.covered.into_iter().flatten());
        failures.extend(users.failures);
    }

    if active.is_empty() {
        tracing::warn!(
            "No active users found in bjobs output; check queue names and user pattern"
        );
    }
    if covered.is_empty() {
        tracing::warn!(
            "No PER_USER limit accounts found with prefix {:?}; check LSF limits",
            config.limit_prefix
        );
    }

    let outcome = reconciler.reconcile(date, &active, &covered)?;

    Ok(AuditReport {
        date,
        queues: config.queues.clone(),
        active,
        covered,
        failures,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use regex::Regex;
    use slotwatch_lsf::{GatewayError, LineSelector};
    use slotwatch_record::{user_set, RecordStore, ReconcileOutcome};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Serves canned scheduler text; unknown queues fail.
    #[derive(Default)]
    struct FakeGateway {
        listings: HashMap<String, String>,
        limits: HashMap<String, String>,
    }

    impl FakeGateway {
        fn with_queue(mut self, queue: &str, listing: &str, limits: &str) -> Self {
            self.listings.insert(queue.to_string(), listing.to_string());
            self.limits.insert(queue.to_string(), limits.to_string());
            self
        }

        fn with_listing_only(mut self, queue: &str, listing: &str) -> Self {
            self.listings.insert(queue.to_string(), listing.to_string());
            self
        }

        fn with_limits_only(mut self, queue: &str, limits: &str) -> Self {
            self.limits.insert(queue.to_string(), limits.to_string());
            self
        }
    }

    impl QueueGateway for FakeGateway {
        async fn list_active_users(&self, queue: &str) -> Result<String, GatewayError> {
            self.listings
                .get(queue)
                .cloned()
                .ok_or_else(|| GatewayError::UnknownQueue(queue.to_string()))
        }

        async fn list_consume_limits(&self, queue: &str) -> Result<String, GatewayError> {
            self.limits
                .get(queue)
                .cloned()
                .ok_or_else(|| GatewayError::UnknownQueue(queue.to_string()))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn temp_reconciler() -> (TempDir, Reconciler) {
        let temp = TempDir::new().unwrap();
        let store = RecordStore::new(Utf8Path::from_path(temp.path()).unwrap());
        (temp, Reconciler::new(store))
    }

    fn config(queues: &[&str]) -> AuditConfig {
        AuditConfig {
            user_filter: Some(Regex::new("dev|test").unwrap()),
            limit_prefix: "slot_".to_string(),
            selector: LineSelector::FirstField,
            ..AuditConfig::new(queues.iter().map(|q| q.to_string()).collect())
        }
    }

    const LIMITS_A: &str = "\
Begin Limit
NAME = slot_a
PER_USER = (dev_alice)
End Limit
Begin Limit
NAME = other
PER_USER = (test_bob)
End Limit
";

    #[tokio::test]
    async fn test_collect_queue() {
        let gateway = FakeGateway::default().with_queue(
            "qa",
            "USER\ndev_alice\ntest_bob\nprod_carol\n",
            LIMITS_A,
        );
        let users = collect_queue(&gateway, "qa", &config(&["qa"])).await;

        assert!(users.failures.is_empty());
        assert_eq!(users.active, Some(user_set(["dev_alice", "test_bob"]).unwrap()));
        assert_eq!(users.covered, Some(user_set(["dev_alice"]).unwrap()));
    }

    #[tokio::test]
    async fn test_collect_queue_keeps_successful_source() {
        let gateway = FakeGateway::default().with_limits_only("qb", LIMITS_A);
        let users = collect_queue(&gateway, "qb", &config(&["qb"])).await;

        assert!(users.active.is_none());
        assert_eq!(users.covered, Some(user_set(["dev_alice"]).unwrap()));
        assert_eq!(users.failures.len(), 1);
        assert_eq!(users.failures[0].source, FailureSource::ActiveUsers);
    }

    #[tokio::test]
    async fn test_run_audit_records_missing() {
        let (_temp, reconciler) = temp_reconciler();
        let gateway = FakeGateway::default()
            .with_queue("qa", "USER\ndev_alice\ntest_bob\n", LIMITS_A)
            .with_queue("qb", "USER\ndev_dan\n", "");

        let report = run_audit(&gateway, &config(&["qa", "qb"]), &reconciler, date())
            .await
            .unwrap();

        assert!(!report.has_failures());
        assert_eq!(report.missing(), user_set(["dev_dan", "test_bob"]).unwrap());
        let path = reconciler.store().path_for(date());
        assert_eq!(fs::read_to_string(path).unwrap(), "dev_dan\ntest_bob\n");
    }

    #[tokio::test]
    async fn test_coverage_is_unioned_across_queues() {
        let (_temp, reconciler) = temp_reconciler();
        let limits_b = "Begin Limit\nNAME = slot_b\nPER_USER = (test_bob)\nEnd Limit\n";
        let gateway = FakeGateway::default()
            .with_queue("qa", "USER\ndev_alice\ntest_bob\n", LIMITS_A)
            .with_queue("qb", "USER\n", limits_b);

        let report = run_audit(&gateway, &config(&["qa", "qb"]), &reconciler, date())
            .await
            .unwrap();

        assert_eq!(report.outcome, ReconcileOutcome::NothingMissing);
        assert!(!reconciler.store().path_for(date()).exists());
    }

    #[tokio::test]
    async fn test_failed_queue_is_reported_and_skipped() {
        let (_temp, reconciler) = temp_reconciler();
        let gateway = FakeGateway::default()
            .with_queue("qa", "USER\ndev_alice\ntest_bob\n", LIMITS_A)
            .with_listing_only("qb", "USER\ndev_dan\n");

        let report = run_audit(
            &gateway,
            &config(&["qa", "qb", "qc"]),
            &reconciler,
            date(),
        )
        .await
        .unwrap();

        assert_eq!(report.failures.len(), 3);
        assert_eq!(
            report.failures[0],
            QueueFailure {
                queue: "qb".to_string(),
                source: FailureSource::ConsumeLimits,
                message: "Queue qb is not known to the scheduler".to_string(),
            }
        );
        assert!(report.failures[1..].iter().all(|f| f.queue == "qc"));

        // qb's listing still counts even though its limits could not be read.
        assert_eq!(
            report.active,
            user_set(["dev_alice", "dev_dan", "test_bob"]).unwrap()
        );
        assert_eq!(report.missing(), user_set(["dev_dan", "test_bob"]).unwrap());
    }

    #[tokio::test]
    async fn test_failed_listing_keeps_queue_limits() {
        let (_temp, reconciler) = temp_reconciler();
        let limits_b = "Begin Limit\nNAME = slot_b\nPER_USER = (dev_alice)\nEnd Limit\n";
        let gateway = FakeGateway::default()
            .with_listing_only("qa", "USER\ndev_alice\n")
            .with_limits_only("qb", limits_b);

        let report = run_audit(&gateway, &config(&["qa", "qb"]), &reconciler, date())
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.covered, user_set(["dev_alice"]).unwrap());
        assert_eq!(report.outcome, ReconcileOutcome::NothingMissing);
        assert!(!reconciler.store().path_for(date()).exists());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_empty_sets_are_warned() {
        let (_temp, reconciler) = temp_reconciler();
        let gateway = FakeGateway::default().with_queue("qa", "USER\n", "");

        let report = run_audit(&gateway, &config(&["qa"]), &reconciler, date())
            .await
            .unwrap();

        assert_eq!(report.outcome, ReconcileOutcome::NothingMissing);
        assert!(logs_contain("No active users found"));
        assert!(logs_contain("No PER_USER limit accounts found"));
    }

    #[tokio::test]
    async fn test_repeat_audit_is_idempotent() {
        let (_temp, reconciler) = temp_reconciler();
        let gateway =
            FakeGateway::default().with_queue("qa", "USER\ndev_alice\ntest_bob\n", LIMITS_A);
        let cfg = config(&["qa"]);

        run_audit(&gateway, &cfg, &reconciler, date()).await.unwrap();
        let report = run_audit(&gateway, &cfg, &reconciler, date()).await.unwrap();

        assert!(matches!(
            report.outcome,
            ReconcileOutcome::AlreadyRecorded { total: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_fatal() {
        let (_temp, reconciler) = temp_reconciler();
        fs::write(reconciler.store().path_for(date()), "a b\n").unwrap();
        let gateway = FakeGateway::default().with_queue("qa", "USER\ndev_x\n", "");

        let result = run_audit(&gateway, &config(&["qa"]), &reconciler, date()).await;
        assert!(matches!(result, Err(RecordError::Corrupt { .. })));
    }
}
