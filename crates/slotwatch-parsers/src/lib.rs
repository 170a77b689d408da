//! Shared parsing utilities for scheduler command output.
//!
//! Line and token helpers used by the job-listing extractor and the
//! limit-block parser, plus the async command runner behind the gateway.

pub mod command;

pub use command::{run_command, CommandError};

/// Iterate the data lines of a tabular listing.
///
/// Leading blank lines are ignored, then `header_lines` lines are dropped
/// unconditionally. Remaining lines are trimmed and blank ones skipped.
pub fn data_lines(raw: &str, header_lines: usize) -> impl Iterator<Item = &str> {
    raw.lines()
        .skip_while(|line| line.trim().is_empty())
        .skip(header_lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

/// First whitespace-delimited field of a line.
pub fn first_field(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Maximal runs of `[A-Za-z0-9_]` in `s`.
pub fn word_tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

/// Remove literal parenthesis characters.
pub fn strip_parens(s: &str) -> String {
    s.chars().filter(|c| *c != '(' && *c != ')').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_lines_skips_header_and_blanks() {
        let raw = "\n\nUSER\n alice \n\n bob\n";
        let lines: Vec<&str> = data_lines(raw, 1).collect();
        assert_eq!(lines, vec!["alice", "bob"]);
    }

    #[test]
    fn test_data_lines_header_only() {
        assert_eq!(data_lines("USER\n", 1).count(), 0);
        assert_eq!(data_lines("", 1).count(), 0);
        assert_eq!(data_lines("USER", 3).count(), 0);
    }

    #[test]
    fn test_first_field() {
        assert_eq!(first_field("alice  RUN normal"), Some("alice"));
        assert_eq!(first_field("   "), None);
    }

    #[test]
    fn test_word_tokens() {
        let tokens: Vec<&str> = word_tokens(" alice, bob_2 ~carol-x ").collect();
        assert_eq!(tokens, vec!["alice", "bob_2", "carol", "x"]);
        assert_eq!(word_tokens("  ,; ").count(), 0);
    }

    #[test]
    fn test_strip_parens() {
        assert_eq!(strip_parens("(alice bob) (carol)"), "alice bob carol");
        assert_eq!(strip_parens("()"), "");
    }
}
