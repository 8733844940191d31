//! Query safety classification module.
//!
//! Lexically classifies SQL text as safe to run on a read-only endpoint or
//! rejected, naming the forbidden keyword or structural rule that tripped.
//! This is a denylist plus an allow-prefix, not a parser: it may refuse some
//! harmless queries, but must never accept a write.

mod classifier;

pub use classifier::{classify_sql, FORBIDDEN_KEYWORDS, READ_PREFIXES};

use std::fmt;

/// Why a query was refused by the classification gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// A write, DDL, privilege or maintenance keyword appears as a standalone token.
    ForbiddenKeyword(&'static str),
    /// The statement does not begin with `SELECT` or `WITH`.
    NotReadQuery,
    /// More than one statement was stacked with `;`.
    MultipleStatements,
}

impl Rejection {
    /// Returns the offending keyword, if the rejection was keyword-based.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::ForbiddenKeyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForbiddenKeyword(keyword) => {
                write!(f, "query contains forbidden keyword: {}", keyword)
            }
            Self::NotReadQuery => write!(f, "only read queries are allowed"),
            Self::MultipleStatements => write!(f, "multiple statements are not allowed"),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationResult {
    /// The query may be executed.
    Safe,
    /// The query must not reach the database.
    Rejected { reason: Rejection },
}

impl ClassificationResult {
    /// Creates a rejected result with the given reason.
    pub fn rejected(reason: Rejection) -> Self {
        Self::Rejected { reason }
    }

    /// Returns true if the query passed the gate.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }

    /// Returns the rejection reason, if any.
    pub fn reason(&self) -> Option<Rejection> {
        match self {
            Self::Safe => None,
            Self::Rejected { reason } => Some(*reason),
        }
    }

    /// Converts the classification into a `Result` for use with `?`.
    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Self::Safe => Ok(()),
            Self::Rejected { reason } => Err(reason),
        }
    }
}

impl fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Rejected { reason } => write!(f, "Rejected: {}", reason),
        }
    }
}
