//! LSF audit types.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A user identifier that is not a usable token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid user id {0:?}")]
pub struct InvalidUserId(pub String);

/// Scheduler account name.
///
/// Opaque and case-sensitive. Must be non-empty and free of whitespace and
/// control characters so it can be stored one per line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidUserId> {
        let id = id.into();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidUserId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = InvalidUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UserId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Sorted, duplicate-free set of users.
pub type UserSet = BTreeSet<UserId>;

/// How a user id is derived from one line of a job listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineSelector {
    /// The whole trimmed line
    WholeLine,
    /// The first whitespace-delimited field
    #[default]
    FirstField,
}

impl FromStr for LineSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whole-line" => Ok(LineSelector::WholeLine),
            "first-field" => Ok(LineSelector::FirstField),
            other => Err(format!(
                "unknown selector {other:?} (expected whole-line or first-field)"
            )),
        }
    }
}

impl fmt::Display for LineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSelector::WholeLine => f.write_str("whole-line"),
            LineSelector::FirstField => f.write_str("first-field"),
        }
    }
}

/// One `Begin Limit ... End Limit` block that carries both NAME and PER_USER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitBlock {
    /// Limit name (NAME field)
    pub name: String,

    /// PER_USER field with parentheses stripped
    pub raw_per_user: String,

    /// Users named by the PER_USER field
    pub covered_users: UserSet,
}

impl LimitBlock {
    /// Whether this block counts as coverage for the given name prefix.
    pub fn applies_to(&self, name_prefix: &str) -> bool {
        self.name.starts_with(name_prefix) && !self.raw_per_user.trim().is_empty()
    }
}
