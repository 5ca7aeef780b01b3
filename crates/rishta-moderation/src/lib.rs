//! Keyword moderation. Classification only: the caller (the chat engine)
//! persists the resulting status; this crate touches nothing.

use serde::{Deserialize, Serialize};

use rishta_types::lifecycle::{MessageStatus, Severity};

/// One administrator-maintained banned term with its assigned severity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedTerm {
    pub term: String,
    pub severity: Severity,
}

/// The banned-term list in effect for a tenant. Always passed in explicitly
/// so tests and tenants can swap lists; there is no global.
#[derive(Debug, Clone, Default)]
pub struct BannedTermList {
    terms: Vec<BannedTerm>,
}

impl BannedTermList {
    pub fn new(terms: Vec<BannedTerm>) -> Self {
        Self { terms }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Severity)>,
        S: Into<String>,
    {
        Self {
            terms: pairs
                .into_iter()
                .map(|(term, severity)| BannedTerm {
                    term: term.into(),
                    severity,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BannedTerm> {
        self.terms.iter()
    }
}

/// Outcome of classifying one message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: MessageStatus,
    pub flagged_terms: Vec<String>,
    pub severity: Severity,
}

impl Verdict {
    fn clean() -> Self {
        Self {
            status: MessageStatus::Approved,
            flagged_terms: Vec::new(),
            severity: Severity::None,
        }
    }
}

/// Classify `content` against `terms`. Case-insensitive substring matching,
/// deliberately no NLP: zero hits approves outright, any hit holds the
/// message for human review at the highest matched severity. Deterministic
/// and side-effect free.
pub fn moderate(content: &str, terms: &BannedTermList) -> Verdict {
    let haystack = content.to_lowercase();

    let mut flagged = Vec::new();
    let mut severity = Severity::None;
    for banned in terms.iter() {
        if haystack.contains(&banned.term.to_lowercase()) {
            flagged.push(banned.term.clone());
            severity = severity.max(banned.severity);
        }
    }

    if flagged.is_empty() {
        Verdict::clean()
    } else {
        Verdict {
            status: MessageStatus::Pending,
            flagged_terms: flagged,
            severity,
        }
    }
}
