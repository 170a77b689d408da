//! Active users from bjobs listings.

use crate::types::{LineSelector, UserId, UserSet};
use regex::Regex;
use slotwatch_parsers::{data_lines, first_field};

/// bjobs arguments listing the owner of every job in a queue.
///
/// Output is one `USER` header line followed by one line per job.
pub(crate) fn bjobs_args(queue: &str) -> [&str; 6] {
    ["-q", queue, "-u", "all", "-o", "USER"]
}

/// Derive a user from one data line.
fn select_user(line: &str, selector: LineSelector) -> Option<&str> {
    match selector {
        LineSelector::WholeLine => Some(line),
        LineSelector::FirstField => first_field(line),
    }
}

/// Extract the set of users active in a queue from raw bjobs output.
///
/// The first `header_lines` lines are discarded. When `filter` is given, a
/// line contributes only if the regex matches somewhere in it.
pub fn extract_users(
    raw: &str,
    header_lines: usize,
    selector: LineSelector,
    filter: Option<&Regex>,
) -> UserSet {
    let mut users = UserSet::new();

    for line in data_lines(raw, header_lines) {
        if filter.is_some_and(|re| !re.is_match(line)) {
            continue;
        }
        let Some(candidate) = select_user(line, selector) else {
            continue;
        };
        match UserId::new(candidate) {
            Ok(user) => {
                users.insert(user);
            }
            Err(e) => tracing::debug!("Skipping bjobs line {:?}: {}", line, e),
        }
    }

    users
}
