use std::collections::BTreeMap;

use log::info;

use crate::domain::article::ArticleNumber;
use crate::error::StoreError;

pub trait WatermarkStore: Send + Sync {
    fn load(&self) -> Result<Watermarks, StoreError>;
    fn save(&self, marks: &Watermarks) -> Result<(), StoreError>;
}

/// Last processed article number per source. 0 means never polled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watermarks {
    marks: BTreeMap<String, ArticleNumber>,
}

impl Watermarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: &str) -> ArticleNumber {
        self.marks.get(source_id).copied().unwrap_or(0)
    }

    pub fn set(&mut self, source_id: impl Into<String>, mark: ArticleNumber) {
        self.marks.insert(source_id.into(), mark);
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArticleNumber)> {
        self.marks.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Make the stored set agree with the configured one: unknown sources
    /// are forgotten, new ones start at 0.
    pub fn reconcile<S: AsRef<str>>(&mut self, sources: &[S]) {
        self.marks.retain(|id, _| {
            let keep = sources.iter().any(|s| s.as_ref() == id);
            if !keep {
                info!("{id}: no longer configured, dropping watermark");
            }
            keep
        });
        for s in sources {
            self.marks.entry(s.as_ref().to_string()).or_insert(0);
        }
    }
}

impl FromIterator<(String, ArticleNumber)> for Watermarks {
    fn from_iter<T: IntoIterator<Item = (String, ArticleNumber)>>(iter: T) -> Self {
        Self {
            marks: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_adds_and_drops() {
        let mut marks: Watermarks = [
            ("old.example".to_string(), 10),
            ("keep.example".to_string(), 20),
        ]
        .into_iter()
        .collect();

        marks.reconcile(&["keep.example", "new.example"]);

        assert_eq!(marks.len(), 2);
        assert_eq!(marks.get("keep.example"), 20);
        assert_eq!(marks.get("new.example"), 0);
        assert_eq!(marks.get("old.example"), 0);
        assert!(!marks.iter().any(|(id, _)| id == "old.example"));
    }
}
