use std::collections::HashSet;

use super::{Scheme, SubjectMatcher};

/// Exact Subject equality against a fixed set of labels.
#[derive(Debug, Clone, Default)]
pub struct PlainTextMatcher {
    subjects: HashSet<String>,
}

impl PlainTextMatcher {
    pub fn new<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subjects: subjects.into_iter().map(Into::into).collect(),
        }
    }
}

impl SubjectMatcher for PlainTextMatcher {
    fn scheme(&self) -> Scheme {
        Scheme::PlainText
    }

    fn len(&self) -> usize {
        self.subjects.len()
    }

    fn is_mine(&self, subject: &str) -> bool {
        self.subjects.contains(subject)
    }
}
