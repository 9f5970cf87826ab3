//! Anonymous subject matching.
//!
//! Every matcher answers one question: given only the Subject of an article,
//! is it addressed to us? [`MatchRules`] chains the configured matchers,
//! cheapest first, and stops at the first positive answer.

pub mod esub;
pub mod hsub;
pub mod plain;

use std::fmt;

pub use esub::EncryptedSubjectMatcher;
pub use hsub::HashedSubjectMatcher;
pub use plain::PlainTextMatcher;

/// Which tagging scheme a matcher implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scheme {
    PlainText,
    Hashed,
    Encrypted,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::PlainText => "text",
            Scheme::Hashed => "hsub",
            Scheme::Encrypted => "esub",
        })
    }
}

pub trait SubjectMatcher: Send + Sync {
    fn scheme(&self) -> Scheme;

    /// Number of configured tags this matcher tests against.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_mine(&self, subject: &str) -> bool;
}

/// The configured matchers, immutable once built.
#[derive(Default)]
pub struct MatchRules {
    matchers: Vec<Box<dyn SubjectMatcher>>,
}

impl MatchRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a matcher. Empty matchers are dropped so they never cost a call.
    pub fn push(&mut self, matcher: Box<dyn SubjectMatcher>) {
        if matcher.is_empty() {
            return;
        }
        self.matchers.push(matcher);
        // stable: plain text before hashes before ciphers
        self.matchers.sort_by_key(|m| m.scheme());
    }

    pub fn with(mut self, matcher: impl SubjectMatcher + 'static) -> Self {
        self.push(Box::new(matcher));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// `(scheme, tag count)` for every active matcher.
    pub fn describe(&self) -> Vec<(Scheme, usize)> {
        self.matchers.iter().map(|m| (m.scheme(), m.len())).collect()
    }

    pub fn is_wanted(&self, subject: &str) -> bool {
        self.matchers.iter().any(|m| m.is_mine(subject))
    }
}

/// Strict hex check shared by the hsub and esub decoders.
pub(crate) fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}
