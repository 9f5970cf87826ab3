use std::collections::HashSet;

/// Message-IDs already looked at during the current cycle.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, message_id: &str) -> bool {
        self.seen.contains(message_id)
    }

    pub fn mark(&mut self, message_id: &str) {
        self.seen.insert(message_id.to_string());
    }

    /// Unique messages examined so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
