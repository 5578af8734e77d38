//! Error Classifier
//!
//! Classifies engine error messages into a small taxonomy for the attempt history.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL error classification taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlErrorClass {
    SyntaxError,
    TableNotFound,
    ColumnNotFound,
    AmbiguousColumn,
    PermissionDenied,
    Timeout,
    Connection,
    Other,
}

impl fmt::Display for SqlErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorClass::SyntaxError => write!(f, "SyntaxError"),
            SqlErrorClass::TableNotFound => write!(f, "TableNotFound"),
            SqlErrorClass::ColumnNotFound => write!(f, "ColumnNotFound"),
            SqlErrorClass::AmbiguousColumn => write!(f, "AmbiguousColumn"),
            SqlErrorClass::PermissionDenied => write!(f, "PermissionDenied"),
            SqlErrorClass::Timeout => write!(f, "Timeout"),
            SqlErrorClass::Connection => write!(f, "Connection"),
            SqlErrorClass::Other => write!(f, "Other"),
        }
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an engine error message (PostgreSQL, MySQL and SQLite wording).
    pub fn classify(&self, message: &str) -> SqlErrorClass {
        let msg = message.to_lowercase();

        if msg.contains("ambiguous") {
            return SqlErrorClass::AmbiguousColumn;
        }

        if msg.contains("no such table")
            || (msg.contains("relation") && msg.contains("does not exist"))
            || (msg.contains("table") && msg.contains("doesn't exist"))
        {
            return SqlErrorClass::TableNotFound;
        }

        if msg.contains("no such column")
            || msg.contains("unknown column")
            || (msg.contains("column") && msg.contains("does not exist"))
        {
            return SqlErrorClass::ColumnNotFound;
        }

        if msg.contains("syntax error") || msg.contains("you have an error in your sql syntax") {
            return SqlErrorClass::SyntaxError;
        }

        if msg.contains("permission denied")
            || msg.contains("read-only")
            || msg.contains("readonly")
            || msg.contains("access denied")
        {
            return SqlErrorClass::PermissionDenied;
        }

        if msg.contains("statement timeout") || msg.contains("timed out") || msg.contains("timeout") {
            return SqlErrorClass::Timeout;
        }

        if msg.contains("connection") || msg.contains("pool") {
            return SqlErrorClass::Connection;
        }

        SqlErrorClass::Other
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_table_not_found() {
        let classifier = ErrorClassifier::new();
        assert_eq!(classifier.classify("no such table: loans"), SqlErrorClass::TableNotFound);
        assert_eq!(
            classifier.classify(r#"error returned from database: relation "loans" does not exist"#),
            SqlErrorClass::TableNotFound
        );
        assert_eq!(
            classifier.classify("Table 'library.loans' doesn't exist"),
            SqlErrorClass::TableNotFound
        );
    }

    #[test]
    fn test_classify_column_not_found() {
        let classifier = ErrorClassifier::new();
        assert_eq!(classifier.classify("no such column: isbn"), SqlErrorClass::ColumnNotFound);
        assert_eq!(
            classifier.classify(r#"column "isbn" does not exist"#),
            SqlErrorClass::ColumnNotFound
        );
    }

    #[test]
    fn test_classify_other_kinds() {
        let classifier = ErrorClassifier::new();
        assert_eq!(classifier.classify(r#"syntax error at or near "FORM""#), SqlErrorClass::SyntaxError);
        assert_eq!(classifier.classify(r#"column reference "id" is ambiguous"#), SqlErrorClass::AmbiguousColumn);
        assert_eq!(
            classifier.classify("canceling statement due to statement timeout"),
            SqlErrorClass::Timeout
        );
        assert_eq!(classifier.classify("attempt to write a readonly database"), SqlErrorClass::PermissionDenied);
        assert_eq!(classifier.classify("division by zero"), SqlErrorClass::Other);
    }
}
