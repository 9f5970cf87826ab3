//! Upstream sources of articles.
//!
//! The engine only sees these two traits. A [`SourceProvider`] opens a
//! session per configured source id; the session answers group, overview
//! and body requests until it is dropped.

pub mod decoders;
pub mod spool;

use crate::domain::article::{ArticleNumber, OverviewEntry};
use crate::error::SourceError;

/// What a source advertises for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupInfo {
    pub first: ArticleNumber,
    pub last: ArticleNumber,
    pub count: u64,
}

pub trait Source {
    fn advertised_range(&mut self, group: &str) -> Result<GroupInfo, SourceError>;

    fn list_overview(
        &mut self,
        group: &str,
        first: ArticleNumber,
        last: ArticleNumber,
    ) -> Result<Vec<OverviewEntry>, SourceError>;

    fn fetch_body(&mut self, message_id: &str) -> Result<Vec<String>, SourceError>;

    /// Polite goodbye. Failures here never matter to the caller.
    fn quit(&mut self) {}
}

pub trait SourceProvider {
    /// Open a session. Any failure here means the source is skipped this
    /// cycle.
    fn connect(&self, source_id: &str) -> Result<Box<dyn Source + '_>, SourceError>;
}
