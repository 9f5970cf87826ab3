use anyhow::Result;
use log::{error, info};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::delivery::MailboxRouter;
use crate::news::SourceProvider;
use crate::retrieval::{CycleSummary, RetrievalEngine, RunContext};
use crate::store::WatermarkStore;

pub struct DaemonConfig {
    pub interval_secs: u64,
}

/// Flag set by Ctrl-C / SIGTERM. Cycles check it between articles.
pub fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let s2 = shutdown.clone();
    ctrlc::set_handler(move || {
        s2.store(true, Ordering::SeqCst);
    })?;
    Ok(shutdown)
}

/// One cycle, then close the mailboxes it touched.
pub fn run_once(
    ctx: &RunContext,
    provider: &dyn SourceProvider,
    store: &dyn WatermarkStore,
    router: &mut MailboxRouter,
    shutdown: &AtomicBool,
) -> Result<CycleSummary> {
    let engine = RetrievalEngine::new(ctx, provider, store).with_shutdown(shutdown);
    let summary = engine.run_cycle(router);
    if let Err(e) = router.close() {
        error!("closing mailboxes: {e}");
    }
    Ok(summary?)
}

/// Repeat cycles every `interval_secs` until shutdown. Watermarks are
/// re-read from the store at the start of each cycle.
pub fn run_daemon(
    ctx: &RunContext,
    provider: &dyn SourceProvider,
    store: &dyn WatermarkStore,
    router: &mut MailboxRouter,
    shutdown: &AtomicBool,
    cfg: DaemonConfig,
) -> Result<()> {
    info!("polling every {}s", cfg.interval_secs);

    while !shutdown.load(Ordering::SeqCst) {
        if let Err(e) = run_once(ctx, provider, store, router, shutdown) {
            error!("cycle failed: {e}");
        }

        // sleep in short slices so Ctrl-C is noticed promptly
        for _ in 0..cfg.interval_secs {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_secs(1));
        }
    }

    info!("shutting down");
    Ok(())
}
