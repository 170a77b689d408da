//! Run summary on stdout.

use camino::Utf8Path;
use serde::Serialize;
use slotwatch_audit::{AuditReport, FailureSource};
use slotwatch_cli::OutputFormat;
use slotwatch_lsf::UserSet;
use slotwatch_record::ReconcileOutcome;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonSummary<'a> {
    #[serde(flatten)]
    report: &'a AuditReport,
    record: &'a Utf8Path,
}

fn join(users: &UserSet) -> String {
    users
        .iter()
        .map(|u| u.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the human-readable summary.
fn render_text(report: &AuditReport, record: &Utf8Path) -> String {
    let mut out = format!(
        "slotwatch {}: {} queue(s), {} active, {} covered, {} missing\n",
        report.date,
        report.queues.len(),
        report.active.len(),
        report.covered.len(),
        report.missing().len()
    );

    match &report.outcome {
        ReconcileOutcome::NothingMissing => {
            out.push_str("  all active users are covered by a slot limit\n");
        }
        ReconcileOutcome::AlreadyRecorded { missing, total } => {
            out.push_str(&format!("  missing: {}\n", join(missing)));
            out.push_str(&format!("  record: {record} unchanged ({total} users)\n"));
        }
        ReconcileOutcome::Updated { added, total, .. } => {
            out.push_str(&format!("  new: {}\n", join(added)));
            out.push_str(&format!("  record: {record} ({total} users)\n"));
        }
    }

    for failure in &report.failures {
        out.push_str(&format!(
            "  warning: queue {}: {} failed: {}\n",
            failure.queue,
            match failure.source {
                FailureSource::ActiveUsers => "bjobs",
                FailureSource::ConsumeLimits => "blimits",
            },
            failure.message
        ));
    }

    out
}

/// Print the summary in the requested format.
pub fn print(report: &AuditReport, record: &Utf8Path, format: OutputFormat) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Text => stdout.write_all(render_text(report, record).as_bytes()),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &JsonSummary { report, record })?;
            writeln!(stdout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use slotwatch_audit::QueueFailure;
    use slotwatch_record::user_set;

    fn report(outcome: ReconcileOutcome) -> AuditReport {
        AuditReport {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            queues: vec!["normal".to_string(), "long".to_string()],
            active: user_set(["alice", "bob", "carol"]).unwrap(),
            covered: user_set(["alice"]).unwrap(),
            failures: vec![],
            outcome,
        }
    }

    #[test]
    fn test_text_updated() {
        let mut report = report(ReconcileOutcome::Updated {
            missing: user_set(["bob", "carol"]).unwrap(),
            added: user_set(["carol"]).unwrap(),
            total: 4,
        });
        report.failures.push(QueueFailure {
            queue: "long".to_string(),
            source: FailureSource::ConsumeLimits,
            message: "Queue long is not known to the scheduler".to_string(),
        });

        let record = Utf8Path::new("results/daily_accounts_20240301.txt");
        let text = render_text(&report, record);
        assert_eq!(
            text,
            "slotwatch 2024-03-01: 2 queue(s), 3 active, 1 covered, 2 missing\n\
             \x20 new: carol\n\
             \x20 record: results/daily_accounts_20240301.txt (4 users)\n\
             \x20 warning: queue long: blimits failed: Queue long is not known to the scheduler\n"
        );
    }

    #[test]
    fn test_text_nothing_missing() {
        let report = report(ReconcileOutcome::NothingMissing);
        let text = render_text(&report, Utf8Path::new("r.txt"));
        assert!(text.contains("0 missing"));
        assert!(text.contains("all active users are covered"));
    }

    #[test]
    fn test_json_shape() {
        let report = report(ReconcileOutcome::AlreadyRecorded {
            missing: user_set(["bob"]).unwrap(),
            total: 1,
        });
        let summary = JsonSummary {
            report: &report,
            record: Utf8Path::new("r.txt"),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["date"], "2024-03-01");
        assert_eq!(value["active"], serde_json::json!(["alice", "bob", "carol"]));
        assert_eq!(value["outcome"]["status"], "already_recorded");
        assert_eq!(value["outcome"]["missing"], serde_json::json!(["bob"]));
        assert_eq!(value["record"], "r.txt");
    }
}
