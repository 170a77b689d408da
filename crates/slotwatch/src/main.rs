//! slotwatch - audit LSF queues for users without a PER_USER slot limit.

mod report;

use chrono::Local;
use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use slotwatch_audit::run_audit;
use slotwatch_cli::{Args, ResolvedConfig};
use slotwatch_lsf::{LsfGateway, SchedulerEnv};
use slotwatch_record::{RecordStore, Reconciler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = ResolvedConfig::from_args(&args)?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());

    let gateway = LsfGateway::new(scheduler_env(&config).await?);
    let store = RecordStore::new(&config.record_dir).with_prefix(config.record_prefix.as_str());
    let reconciler = Reconciler::new(store);

    let report = run_audit(&gateway, &config.audit, &reconciler, date)
        .await
        .into_diagnostic()
        .wrap_err("Daily account record was not updated")?;

    let record_path = reconciler.store().path_for(date);
    report::print(&report, &record_path, args.format).into_diagnostic()?;

    if report.has_failures() {
        tracing::warn!(
            "{} queue listing(s) failed, see summary",
            report.failures.len()
        );
    }
    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = if verbose {
        "slotwatch=debug,slotwatch_lsf=debug,slotwatch_record=debug,slotwatch_audit=debug"
    } else {
        "slotwatch=info,slotwatch_lsf=warn,slotwatch_record=info,slotwatch_audit=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// Scheduler environment: profile variables first, explicit directories on top.
async fn scheduler_env(config: &ResolvedConfig) -> Result<SchedulerEnv> {
    let mut env = config.scheduler.clone();
    if let Some(profile) = &config.profile {
        let captured = SchedulerEnv::from_profile(profile)
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to load LSF environment from {profile}"))?;
        env.extra = captured.extra;
    }
    Ok(env)
}
