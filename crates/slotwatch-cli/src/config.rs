//! Configuration file loading and merging with command line flags.

use crate::Args;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use regex::Regex;
use serde::Deserialize;
use slotwatch_audit::AuditConfig;
use slotwatch_lsf::{LineSelector, SchedulerEnv};
use slotwatch_record::DEFAULT_RECORD_PREFIX;
use std::fs;
use thiserror::Error;

const DEFAULT_RECORD_DIR: &str = "./results";

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    #[diagnostic(code(slotwatch::config::read_failed))]
    ReadFailed {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    #[diagnostic(
        code(slotwatch::config::parse_failed),
        help("Check the TOML syntax and field names")
    )]
    ParseFailed {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No queues to audit")]
    #[diagnostic(
        code(slotwatch::config::no_queues),
        help("Pass --queue or set `queues` in the config file")
    )]
    NoQueues,

    #[error("Invalid user pattern {pattern:?}")]
    #[diagnostic(code(slotwatch::config::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Scheduler section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub bindir: Option<Utf8PathBuf>,
    pub serverdir: Option<Utf8PathBuf>,
    pub libdir: Option<Utf8PathBuf>,
    pub envdir: Option<Utf8PathBuf>,
    /// csh profile sourced to capture LSF variables
    pub profile: Option<Utf8PathBuf>,
}

/// Contents of the TOML config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub queues: Vec<String>,
    pub user_pattern: Option<String>,
    pub limit_prefix: Option<String>,
    pub record_dir: Option<Utf8PathBuf>,
    pub record_prefix: Option<String>,
    pub selector: Option<LineSelector>,
    pub header_lines: Option<usize>,
    pub scheduler: SchedulerConfig,
}

impl FileConfig {
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Everything the binary needs to run one audit.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub audit: AuditConfig,
    pub record_dir: Utf8PathBuf,
    /// File name prefix of the daily records
    pub record_prefix: String,
    /// Explicit LSF directories. Profile variables are merged in by the caller.
    pub scheduler: SchedulerEnv,
    pub profile: Option<Utf8PathBuf>,
}

impl ResolvedConfig {
    /// Load the config file named by `--config`, if any, and apply the flags.
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    /// Command line flags take precedence over the file.
    pub fn merge(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let queues = if args.queues.is_empty() {
            file.queues
        } else {
            args.queues.clone()
        };
        if queues.is_empty() {
            return Err(ConfigError::NoQueues);
        }

        let user_filter = match args.user_pattern.clone().or(file.user_pattern) {
            Some(pattern) if !pattern.is_empty() => Some(
                Regex::new(&pattern)
                    .map_err(|source| ConfigError::InvalidPattern { pattern, source })?,
            ),
            _ => None,
        };

        let audit = AuditConfig {
            queues,
            user_filter,
            limit_prefix: args
                .limit_prefix
                .clone()
                .or(file.limit_prefix)
                .unwrap_or_default(),
            header_lines: args.header_lines.or(file.header_lines).unwrap_or(1),
            selector: args.selector.or(file.selector).unwrap_or_default(),
        };

        let scheduler = SchedulerEnv {
            bindir: args.lsf_bindir.clone().or(file.scheduler.bindir),
            serverdir: file.scheduler.serverdir,
            libdir: file.scheduler.libdir,
            envdir: args.lsf_envdir.clone().or(file.scheduler.envdir),
            ..SchedulerEnv::default()
        };

        Ok(Self {
            audit,
            record_dir: args
                .record_dir
                .clone()
                .or(file.record_dir)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_RECORD_DIR)),
            record_prefix: args
                .record_prefix
                .clone()
                .or(file.record_prefix)
                .unwrap_or_else(|| DEFAULT_RECORD_PREFIX.to_string()),
            scheduler,
            profile: args.lsf_profile.clone().or(file.scheduler.profile),
        })
    }
}
