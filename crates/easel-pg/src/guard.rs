//! Textual read-only guard for caller-supplied SQL.
//!
//! This is a best-effort filter, not a security boundary: it keeps
//! well-meaning callers from mutating data through the query tool, and
//! the grant set of the database role does the real enforcement. The
//! check runs before any connection is opened.

use thiserror::Error;

/// Statement keywords that disqualify a query.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
];

/// Why a query was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardRejection {
    #[error("only SELECT and WITH queries are allowed")]
    NotReadOnly,

    #[error("query contains forbidden keyword {0}")]
    ForbiddenKeyword(String),
}

/// Classify a query as read-only or rejected.
///
/// The first token must be `SELECT` or `WITH`, and no later token may be
/// one of the mutation keywords. Tokens are maximal runs of ASCII
/// alphanumerics and underscores, so a table named `updates` passes while
/// a stacked `; DROP TABLE` does not. Keywords inside string literals are
/// still caught; that false positive is the accepted cost of staying
/// textual.
pub fn classify(sql: &str) -> Result<(), GuardRejection> {
    let upper = sql.trim().to_uppercase();
    let mut tokens = upper
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty());

    match tokens.next() {
        Some("SELECT") | Some("WITH") => {}
        _ => return Err(GuardRejection::NotReadOnly),
    }

    for token in tokens {
        if FORBIDDEN_KEYWORDS.contains(&token) {
            return Err(GuardRejection::ForbiddenKeyword(token.to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_passes() {
        assert_eq!(classify("SELECT * FROM users"), Ok(()));
    }

    #[test]
    fn cte_passes() {
        assert_eq!(
            classify("WITH recent AS (SELECT * FROM events) SELECT count(*) FROM recent"),
            Ok(())
        );
    }

    #[test]
    fn lowercase_is_classified_case_insensitively() {
        assert_eq!(classify("select id from users"), Ok(()));
        assert_eq!(
            classify("delete from users"),
            Err(GuardRejection::NotReadOnly)
        );
    }

    #[test]
    fn leading_whitespace_is_ignored() {
        assert_eq!(classify("   \n SELECT 1"), Ok(()));
    }

    #[test]
    fn table_named_like_keyword_passes() {
        // UPDATES is a distinct token from UPDATE.
        assert_eq!(classify("SELECT * FROM updates"), Ok(()));
        assert_eq!(classify("SELECT created_at FROM deleted_items"), Ok(()));
    }

    #[test]
    fn mutation_statement_is_not_read_only() {
        assert_eq!(
            classify("UPDATE users SET name = 'x'"),
            Err(GuardRejection::NotReadOnly)
        );
        assert_eq!(
            classify("DROP TABLE users"),
            Err(GuardRejection::NotReadOnly)
        );
    }

    #[test]
    fn stacked_statement_is_rejected() {
        assert_eq!(
            classify("SELECT 1; DROP TABLE users"),
            Err(GuardRejection::ForbiddenKeyword("DROP".to_string()))
        );
    }

    #[test]
    fn data_modifying_cte_is_rejected() {
        assert_eq!(
            classify("WITH gone AS (DELETE FROM users RETURNING id) SELECT * FROM gone"),
            Err(GuardRejection::ForbiddenKeyword("DELETE".to_string()))
        );
    }

    #[test]
    fn empty_input_is_not_read_only() {
        assert_eq!(classify(""), Err(GuardRejection::NotReadOnly));
        assert_eq!(classify("   "), Err(GuardRejection::NotReadOnly));
    }

    #[test]
    fn keyword_in_string_literal_is_still_caught() {
        // Documented false positive of the textual scan.
        assert_eq!(
            classify("SELECT 'DROP'"),
            Err(GuardRejection::ForbiddenKeyword("DROP".to_string()))
        );
    }
}
