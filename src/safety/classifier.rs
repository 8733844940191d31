//! Lexical SQL classification logic.
//!
//! Uses regular expressions to strip comments, scan for forbidden keywords on
//! word boundaries and check the leading keyword. The keyword list and the
//! read prefixes below are the only definition of what the gate allows.

use std::sync::LazyLock;

use regex::Regex;

use super::{ClassificationResult, Rejection};

/// Keywords that must never appear as a standalone token in a gated query.
///
/// Covers row writes, DDL, privilege changes and SQLite's maintenance and
/// database-attachment statements.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "REPLACE", "MERGE",
    "GRANT", "REVOKE", "PRAGMA", "ATTACH", "DETACH", "VACUUM", "REINDEX",
];

/// Leading keywords accepted for a read query.
pub const READ_PREFIXES: &[&str] = &["SELECT", "WITH"];

/// Quoted literals, quoted identifiers, line comments and block comments.
///
/// Literals come first so that comment markers inside them are consumed as
/// part of the literal. Unterminated literals and block comments run to the
/// end of the text, the way SQLite reads them.
static LEXEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"'(?:[^']|'')*(?:'|$)"#,
        r#"|"(?:[^"]|"")*(?:"|$)"#,
        r"|`(?:[^`]|``)*(?:`|$)",
        r"|\[[^\]]*(?:\]|$)",
        r"|--[^\n]*",
        r"|(?s:/\*.*?(?:\*/|$))",
    ))
    .expect("lexeme pattern is valid")
});

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({})\b", FORBIDDEN_KEYWORDS.join("|")))
        .expect("forbidden keyword pattern is valid")
});

static READ_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*(?:{})\b", READ_PREFIXES.join("|")))
        .expect("read prefix pattern is valid")
});

/// Classifies SQL text for execution on the read-only endpoint.
///
/// Checks run in order: forbidden keywords, read prefix, stacked statements.
/// Empty input is rejected as [`Rejection::NotReadQuery`]; callers that need
/// to report "no query provided" must check for it first.
pub fn classify_sql(sql: &str) -> ClassificationResult {
    let scrubbed = Scrubbed::new(sql.trim());
    let text = scrubbed.text.to_uppercase();

    if let Some(keyword) = find_forbidden_keyword(&text) {
        return ClassificationResult::rejected(Rejection::ForbiddenKeyword(keyword));
    }

    if !READ_PREFIX.is_match(&text) {
        return ClassificationResult::rejected(Rejection::NotReadQuery);
    }

    if has_stacked_statements(&scrubbed.code) {
        return ClassificationResult::rejected(Rejection::MultipleStatements);
    }

    ClassificationResult::Safe
}

/// Two working copies of a query with comments removed.
struct Scrubbed {
    /// Comments replaced by a space; literals kept verbatim for keyword scanning.
    text: String,
    /// Comments replaced by a space and literals blanked, for structural checks.
    code: String,
}

impl Scrubbed {
    fn new(sql: &str) -> Self {
        let mut text = String::with_capacity(sql.len());
        let mut code = String::with_capacity(sql.len());
        let mut last = 0;

        for lexeme in LEXEME.find_iter(sql) {
            let between = &sql[last..lexeme.start()];
            text.push_str(between);
            code.push_str(between);

            let lexeme_text = lexeme.as_str();
            if lexeme_text.starts_with("--") || lexeme_text.starts_with("/*") {
                // A comment separates tokens, so it must not glue its neighbours together.
                text.push(' ');
                code.push(' ');
            } else {
                text.push_str(lexeme_text);
                code.push_str("''");
            }
            last = lexeme.end();
        }

        text.push_str(&sql[last..]);
        code.push_str(&sql[last..]);

        Self { text, code }
    }
}

/// Returns the first forbidden keyword in the (uppercased) text.
fn find_forbidden_keyword(text: &str) -> Option<&'static str> {
    let found = FORBIDDEN.captures(text)?.get(1)?.as_str();
    FORBIDDEN_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| *keyword == found)
}

/// Returns true if anything other than semicolons follows the first `;`.
fn has_stacked_statements(code: &str) -> bool {
    code.find(';')
        .map(|idx| {
            code[idx..]
                .chars()
                .any(|c| c != ';' && !c.is_whitespace())
        })
        .unwrap_or(false)
}
