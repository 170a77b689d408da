//! Consumable limit parsing from `blimits -c` output.
//!
//! The configuration dump is a sequence of non-nested blocks:
//!
//! ```text
//! Begin Limit
//! NAME     = slotlimit_dev
//! PER_USER = (alice bob)
//! SLOTS    = 64
//! End Limit
//! ```
//!
//! Only NAME and PER_USER matter here. Everything outside a block is ignored.

use crate::types::{LimitBlock, UserId, UserSet};
use once_cell::sync::Lazy;
use regex::Regex;
use slotwatch_parsers::{strip_parens, word_tokens};

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Begin Limit(.*?)End Limit").expect("valid block regex"));

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*NAME[ \t]*[:=][ \t]*(\S+)").expect("valid NAME regex"));

static PER_USER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*PER_USER[ \t]*[:=][ \t]*([^\r\n]*)").expect("valid PER_USER regex")
});

/// blimits arguments dumping the limit configuration for a queue.
pub(crate) fn blimits_args(queue: &str) -> [&str; 3] {
    ["-q", queue, "-c"]
}

/// Parse one block body. Returns None when NAME or PER_USER is missing.
fn parse_block(body: &str) -> Option<LimitBlock> {
    let name = NAME_RE.captures(body)?.get(1)?.as_str().to_string();
    let per_user = PER_USER_RE.captures(body)?.get(1)?.as_str();

    let raw_per_user = strip_parens(per_user);
    let covered_users = word_tokens(&raw_per_user)
        .filter_map(|token| UserId::new(token).ok())
        .collect();

    Some(LimitBlock {
        name,
        raw_per_user,
        covered_users,
    })
}

/// Scan all limit blocks that carry both a NAME and a PER_USER field.
pub fn scan_limit_blocks(raw: &str) -> Vec<LimitBlock> {
    let mut blocks = Vec::new();
    let mut seen = 0usize;

    for caps in BLOCK_RE.captures_iter(raw) {
        seen += 1;
        let body = caps.get(1).map_or("", |m| m.as_str());
        match parse_block(body) {
            Some(block) => blocks.push(block),
            None => tracing::debug!("Skipping limit block {} without NAME/PER_USER", seen),
        }
    }

    if seen == 0 {
        tracing::warn!("No Begin Limit/End Limit blocks found in blimits output");
    }

    blocks
}

/// Users covered by a PER_USER limit whose name starts with `name_prefix`.
///
/// Blocks with a different name, without PER_USER, or with an empty PER_USER
/// list contribute nothing. Duplicate block names are unioned.
pub fn parse_limit_blocks(raw: &str, name_prefix: &str) -> UserSet {
    let mut users = UserSet::new();

    for block in scan_limit_blocks(raw) {
        if !block.applies_to(name_prefix) {
            tracing::debug!("Limit {} does not match prefix {:?}", block.name, name_prefix);
            continue;
        }
        users.extend(block.covered_users);
    }

    users
}
