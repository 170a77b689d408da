//! Scheduler environment passed explicitly to LSF commands.

use camino::{Utf8Path, Utf8PathBuf};
use slotwatch_parsers::{run_command, CommandError};
use std::collections::BTreeMap;
use tokio::process::Command;

/// Environment for LSF child processes.
///
/// Applied per command, the parent process environment is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerEnv {
    /// LSF_BINDIR, also used to resolve bjobs/blimits
    pub bindir: Option<Utf8PathBuf>,
    /// LSF_SERVERDIR
    pub serverdir: Option<Utf8PathBuf>,
    /// LSF_LIBDIR
    pub libdir: Option<Utf8PathBuf>,
    /// LSF_ENVDIR
    pub envdir: Option<Utf8PathBuf>,
    /// Additional variables, typically captured from an LSF profile
    pub extra: BTreeMap<String, String>,
}

impl SchedulerEnv {
    /// Capture the variables exported by an LSF csh profile.
    ///
    /// Runs `csh -c 'source <profile> && env'` and keeps every `KEY=VALUE` line.
    pub async fn from_profile(profile: &Utf8Path) -> Result<Self, CommandError> {
        let mut cmd = Command::new("csh");
        cmd.arg("-c").arg(format!("source {profile} && env"));
        let stdout = run_command(&mut cmd, "csh").await?;

        let extra = parse_env_output(&stdout);
        tracing::debug!("Captured {} variables from {}", extra.len(), profile);
        Ok(Self {
            extra,
            ..Self::default()
        })
    }

    /// Path of an LSF binary, under `bindir` when one is configured.
    pub fn program(&self, name: &str) -> Utf8PathBuf {
        match &self.bindir {
            Some(dir) => dir.join(name),
            None => Utf8PathBuf::from(name),
        }
    }

    /// Variables to set on a child command. Explicit directories win over
    /// captured values.
    pub fn vars(&self) -> BTreeMap<String, String> {
        let mut vars = self.extra.clone();
        let dirs = [
            ("LSF_BINDIR", &self.bindir),
            ("LSF_SERVERDIR", &self.serverdir),
            ("LSF_LIBDIR", &self.libdir),
            ("LSF_ENVDIR", &self.envdir),
        ];
        for (key, dir) in dirs {
            if let Some(dir) = dir {
                vars.insert(key.to_string(), dir.to_string());
            }
        }
        vars
    }

    /// Build a command for an LSF binary with this environment applied.
    pub fn command(&self, name: &str) -> Command {
        let mut cmd = Command::new(self.program(name).as_std_path());
        cmd.envs(self.vars());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Parse `env` output into a map. Lines without `=` are ignored.
fn parse_env_output(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
