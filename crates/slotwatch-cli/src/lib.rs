//! CLI argument parsing and configuration for slotwatch.

pub mod config;

pub use config::{ConfigError, FileConfig, ResolvedConfig, SchedulerConfig};

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use slotwatch_lsf::LineSelector;

/// Summary format printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Default)]
#[command(name = "slotwatch")]
#[command(about = "Report LSF users running in audited queues without a PER_USER slot limit")]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Queue to audit (repeatable, replaces the configured list)
    #[arg(short, long = "queue")]
    pub queues: Vec<String>,

    /// Only job lines matching this regex count as active users
    #[arg(long)]
    pub user_pattern: Option<String>,

    /// Limit names must start with this prefix to count as coverage
    #[arg(long)]
    pub limit_prefix: Option<String>,

    /// Directory for the daily record files
    #[arg(long)]
    pub record_dir: Option<Utf8PathBuf>,

    /// Record file name prefix (default: daily_accounts_)
    #[arg(long)]
    pub record_prefix: Option<String>,

    /// How a user is read from a bjobs line (whole-line or first-field)
    #[arg(long)]
    pub selector: Option<LineSelector>,

    /// Header lines to skip in bjobs output
    #[arg(long)]
    pub header_lines: Option<usize>,

    /// LSF binary directory (LSF_BINDIR)
    #[arg(long)]
    pub lsf_bindir: Option<Utf8PathBuf>,

    /// LSF configuration directory (LSF_ENVDIR)
    #[arg(long)]
    pub lsf_envdir: Option<Utf8PathBuf>,

    /// csh profile to capture the LSF environment from
    #[arg(long)]
    pub lsf_profile: Option<Utf8PathBuf>,

    /// Record date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
