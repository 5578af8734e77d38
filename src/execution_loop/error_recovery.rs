//! Error Recovery
//!
//! Builds the self-correction prompt sent to the generator after a failed attempt.

/// Prompt for the first attempt (`last_error == None`) or a correction attempt.
pub fn build_recovery_prompt(question: &str, last_error: Option<&str>) -> String {
    match last_error {
        None => question.to_string(),
        Some(error) => format!(
            "{}\n\nPrevious query failed with error: {}\nPlease fix the query.",
            question, error
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_passes_question_verbatim() {
        assert_eq!(build_recovery_prompt("List all books", None), "List all books");
    }

    #[test]
    fn test_retry_includes_error_and_instruction() {
        let prompt = build_recovery_prompt("List all books", Some("no such table: book"));
        assert_eq!(
            prompt,
            "List all books\n\nPrevious query failed with error: no such table: book\nPlease fix the query."
        );
    }
}
