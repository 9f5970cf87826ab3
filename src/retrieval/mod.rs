//! One polling cycle across every configured source.
//!
//! Sources are handled one after another. For each: connect, work out the
//! article range, list it, run every new entry through the deduplicator and
//! the match rules, deliver what is ours, and only then move the source's
//! watermark. Anything that goes wrong part way leaves the watermark alone,
//! so the same range comes round again next cycle.

pub mod context;
pub mod dedupe;
pub mod range;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

pub use context::{RunContext, Settings};
pub use dedupe::Deduplicator;
pub use range::next_range;

use crate::delivery::DeliveryRouter;
use crate::domain::article::{ArticleNumber, DeliveredMessage};
use crate::error::{DeliveryError, SourceError, StoreError};
use crate::news::{Source, SourceProvider};
use crate::store::WatermarkStore;

/// Where a source is within a cycle. Only used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Idle,
    Connecting,
    RangeComputed,
    Listed,
    Matching,
    Updated,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Every listed article was handled; the watermark moved.
    Updated {
        watermark: ArticleNumber,
        examined: usize,
        delivered: usize,
    },
    /// Nothing new on the source.
    Skipped,
    Failed { reason: String },
    /// Shutdown was requested before the source finished.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source_id: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Messages delivered.
    pub received: usize,
    /// Distinct Message-IDs examined.
    pub unique: usize,
    pub attempted: usize,
    /// Sources that ended `Updated` or `Skipped`.
    pub succeeded: usize,
    pub reports: Vec<SourceReport>,
}

impl CycleSummary {
    pub fn outcome(&self, source_id: &str) -> Option<&SourceOutcome> {
        self.reports
            .iter()
            .find(|r| r.source_id == source_id)
            .map(|r| &r.outcome)
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received {} messages. {} of {} servers succeeded, {} unique messages were processed.",
            self.received, self.succeeded, self.attempted, self.unique
        )
    }
}

enum Abort {
    Source(SourceError),
    Delivery(DeliveryError),
    Cancelled,
}

impl From<SourceError> for Abort {
    fn from(e: SourceError) -> Self {
        Abort::Source(e)
    }
}

impl From<DeliveryError> for Abort {
    fn from(e: DeliveryError) -> Self {
        Abort::Delivery(e)
    }
}

fn enter(source_id: &str, state: SourceState) {
    debug!("{source_id}: {state:?}");
}

pub struct RetrievalEngine<'a> {
    ctx: &'a RunContext,
    provider: &'a dyn SourceProvider,
    store: &'a dyn WatermarkStore,
    shutdown: Option<&'a AtomicBool>,
}

impl<'a> RetrievalEngine<'a> {
    pub fn new(
        ctx: &'a RunContext,
        provider: &'a dyn SourceProvider,
        store: &'a dyn WatermarkStore,
    ) -> Self {
        Self {
            ctx,
            provider,
            store,
            shutdown: None,
        }
    }

    /// Stop between articles once `flag` is set. The source being worked on
    /// keeps its old watermark.
    pub fn with_shutdown(mut self, flag: &'a AtomicBool) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.shutdown.is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Run one cycle. Only an unreadable watermark store is an error; source
    /// and delivery failures are reported in the summary.
    pub fn run_cycle(&self, router: &mut dyn DeliveryRouter) -> Result<CycleSummary, StoreError> {
        let mut marks = self.store.load()?;
        marks.reconcile(&self.ctx.sources);

        let mut dedupe = Deduplicator::new();
        let mut summary = CycleSummary::default();

        for id in &self.ctx.sources {
            if self.cancelled() {
                info!("shutdown requested, not polling {id}");
                break;
            }
            summary.attempted += 1;
            enter(id, SourceState::Idle);

            let outcome = match self.process_source(id, marks.get(id), &mut dedupe, router) {
                Ok(outcome) => outcome,
                Err(Abort::Cancelled) => SourceOutcome::Cancelled,
                Err(Abort::Source(e)) => SourceOutcome::Failed {
                    reason: e.to_string(),
                },
                Err(Abort::Delivery(e)) => SourceOutcome::Failed {
                    reason: format!("delivery failed: {e}"),
                },
            };

            match &outcome {
                SourceOutcome::Updated {
                    watermark,
                    examined,
                    delivered,
                } => {
                    info!("{id}: examined {examined}, delivered {delivered}, now at {watermark}");
                    marks.set(id.as_str(), *watermark);
                    if let Err(e) = self.store.save(&marks) {
                        error!("{id}: could not persist watermark {watermark}: {e}");
                    }
                    summary.received += delivered;
                    summary.succeeded += 1;
                }
                SourceOutcome::Skipped => summary.succeeded += 1,
                SourceOutcome::Failed { reason } => {
                    enter(id, SourceState::Failed);
                    warn!("{id}: skipped this cycle: {reason}");
                }
                SourceOutcome::Cancelled => info!("{id}: cancelled, watermark unchanged"),
            }
            summary.reports.push(SourceReport {
                source_id: id.clone(),
                outcome,
            });
        }

        summary.unique = dedupe.len();
        // also records sources added or dropped by reconcile
        if let Err(e) = self.store.save(&marks) {
            error!("could not persist watermarks: {e}");
        }
        info!("{summary}");
        Ok(summary)
    }

    fn process_source(
        &self,
        id: &str,
        stored: ArticleNumber,
        dedupe: &mut Deduplicator,
        router: &mut dyn DeliveryRouter,
    ) -> Result<SourceOutcome, Abort> {
        enter(id, SourceState::Connecting);
        let mut session = self.provider.connect(id)?;
        let result = self.scan(id, session.as_mut(), stored, dedupe, router);
        session.quit();
        result
    }

    fn scan(
        &self,
        id: &str,
        session: &mut dyn Source,
        stored: ArticleNumber,
        dedupe: &mut Deduplicator,
        router: &mut dyn DeliveryRouter,
    ) -> Result<SourceOutcome, Abort> {
        let settings = &self.ctx.settings;
        let group = settings.newsgroup.as_str();

        let advertised = session.advertised_range(group)?;
        let range = next_range(
            id,
            advertised.first,
            advertised.last,
            stored,
            settings.fetch_limit,
        );
        enter(id, SourceState::RangeComputed);
        info!("{id}: processing {} messages", range.len());
        if range.is_empty() {
            enter(id, SourceState::Skipped);
            info!("{id}: nothing to be read");
            return Ok(SourceOutcome::Skipped);
        }

        let mut entries = session.list_overview(group, range.first, range.last)?;
        entries.retain(|e| range.contains(e.number));
        entries.sort_by_key(|e| e.number);
        enter(id, SourceState::Listed);

        enter(id, SourceState::Matching);
        let mut examined = 0;
        let mut delivered = 0;
        for entry in &entries {
            if self.cancelled() {
                return Err(Abort::Cancelled);
            }
            if dedupe.seen(&entry.message_id) {
                debug!("{id}: {} already seen this cycle", entry.message_id);
                continue;
            }
            dedupe.mark(&entry.message_id);
            examined += 1;

            // with fetch_all every body crosses the wire, wanted or not
            let prefetched = if settings.fetch_all {
                Some(session.fetch_body(&entry.message_id)?)
            } else {
                None
            };
            if !self.ctx.rules.is_wanted(&entry.subject) {
                continue;
            }
            let body = match prefetched {
                Some(body) => body,
                None => session.fetch_body(&entry.message_id)?,
            };
            router.deliver(&DeliveredMessage::new(entry, body))?;
            delivered += 1;
            debug!("{id}: delivered article {}", entry.number);
        }

        enter(id, SourceState::Updated);
        Ok(SourceOutcome::Updated {
            watermark: range.last,
            examined,
            delivered,
        })
    }
}
