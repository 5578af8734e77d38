//! Cleanup of raw generator output before it reaches the validator.

use regex::Regex;
use std::sync::OnceLock;

fn dialect_label() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| {
        Regex::new(r"(?i)^(?:sql|mysql|postgresql|postgres|sqlite)\b\s*").expect("valid dialect label pattern")
    })
}

fn whitespace_run() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Strips markdown fences, a leading dialect label and one trailing `;`, and
/// collapses whitespace to single spaces.
pub fn sanitize_candidate(raw: &str) -> String {
    let without_fences = raw.replace("```", "");
    let trimmed = without_fences.trim();
    let unlabeled = dialect_label().replace(trimmed, "");
    let collapsed = whitespace_run().replace_all(&unlabeled, " ");
    let collapsed = collapsed.trim();
    collapsed
        .strip_suffix(';')
        .map(str::trim_end)
        .unwrap_or(collapsed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fenced_block_with_label() {
        let raw = "```sql\nSELECT *\n  FROM books\n```";
        assert_eq!(sanitize_candidate(raw), "SELECT * FROM books");
    }

    #[test]
    fn test_strips_trailing_terminator_once() {
        assert_eq!(sanitize_candidate("SELECT 1 ;"), "SELECT 1");
        assert_eq!(sanitize_candidate("SELECT 1;;"), "SELECT 1;");
    }

    #[test]
    fn test_label_is_case_insensitive_and_whole_word() {
        assert_eq!(sanitize_candidate("MySQL SELECT 1"), "SELECT 1");
        assert_eq!(sanitize_candidate("sqlite_master_view"), "sqlite_master_view");
    }

    #[test]
    fn test_inner_separators_survive_for_the_validator() {
        assert_eq!(
            sanitize_candidate("SELECT * FROM books; SELECT * FROM users;"),
            "SELECT * FROM books; SELECT * FROM users"
        );
    }

    #[test]
    fn test_blank_output_stays_blank() {
        assert_eq!(sanitize_candidate("```\n\n```"), "");
    }
}
