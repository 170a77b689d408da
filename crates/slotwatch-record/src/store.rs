use crate::types::DailyAccountRecord;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use slotwatch_lsf::{UserId, UserSet};
use std::fs;
use std::io::{self, Write};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Corrupt record {path} at line {line}: {content:?}")]
    Corrupt {
        path: Utf8PathBuf,
        line: usize,
        content: String,
    },
}

impl RecordError {
    fn io(path: &Utf8Path, source: io::Error) -> Self {
        RecordError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File name prefix used when none is configured.
pub const DEFAULT_RECORD_PREFIX: &str = "daily_accounts_";

/// Date-keyed storage for daily account records.
///
/// Each day is a plain text file `<prefix>YYYYMMDD.txt` in the record
/// directory, one user per line, sorted. Stores with different prefixes can
/// share a directory.
pub struct RecordStore {
    dir: Utf8PathBuf,
    prefix: String,
}

impl RecordStore {
    pub fn new(dir: &Utf8Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: DEFAULT_RECORD_PREFIX.to_string(),
        }
    }

    /// Use a different file name prefix, e.g. one per audited cluster.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Path of the record file for a day.
    pub fn path_for(&self, date: NaiveDate) -> Utf8PathBuf {
        self.dir
            .join(format!("{}{}.txt", self.prefix, date.format("%Y%m%d")))
    }

    /// Load the record for a day.
    ///
    /// Returns `None` if no file exists. A file that cannot be read or holds
    /// a line that is not a user id is an error, never an empty record.
    pub fn load(&self, date: NaiveDate) -> Result<Option<DailyAccountRecord>, RecordError> {
        let path = self.path_for(date);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RecordError::io(&path, e)),
        };

        let mut users = UserSet::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let user = UserId::new(line).map_err(|_| RecordError::Corrupt {
                path: path.clone(),
                line: idx + 1,
                content: line.to_string(),
            })?;
            users.insert(user);
        }

        Ok(Some(DailyAccountRecord { date, users }))
    }

    /// Save a record, replacing the previous file for its day.
    ///
    /// The contents are written to a temporary file in the same directory and
    /// renamed over the target, so a failed write leaves the old file intact.
    pub fn save(&self, record: &DailyAccountRecord) -> Result<(), RecordError> {
        let path = self.path_for(record.date);
        fs::create_dir_all(&self.dir).map_err(|e| RecordError::io(&self.dir, e))?;

        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| RecordError::io(&self.dir, e))?;
        tmp.write_all(record.to_text().as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| RecordError::io(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(|e| RecordError::io(&path, e))?;
        }

        tmp.persist(&path)
            .map_err(|e| RecordError::io(&path, e.error))?;
        tracing::debug!("Wrote {} users to {}", record.users.len(), path);
        Ok(())
    }
}
