//! Fixed-period harvesting.
//!
//! The first cycle runs as soon as the scheduler starts; after that one cycle
//! per period, forever. Ticks stay aligned to the start time, not to cycle
//! completion. Cycles are serialized: a tick that comes due while a cycle is
//! still running fires once that cycle finishes, and any further ticks missed
//! in the meantime are dropped. A failed cycle is logged and forgotten; it
//! never stops the loop.

use crate::fetch::FetchDocument;
use crate::hub::Publisher;
use crate::pipeline::Harvest;
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The batch was stored and broadcast.
    Published { stored: usize, delivered: usize },
    /// The listing had no stories; nothing stored or sent.
    Empty,
    /// The listing could not be fetched.
    Failed,
}

pub struct Scheduler<F, S, P> {
    fetcher: Arc<F>,
    store: Arc<S>,
    publisher: Arc<P>,
    harvest: Harvest,
    period: Duration,
}

impl<F, S, P> Scheduler<F, S, P>
where
    F: FetchDocument + 'static,
    S: Store + 'static,
    P: Publisher + 'static,
{
    pub fn new(
        fetcher: Arc<F>,
        store: Arc<S>,
        publisher: Arc<P>,
        harvest: Harvest,
        period: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            publisher,
            harvest,
            period,
        }
    }

    /// Fetch, aggregate, persist, publish.
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&self) -> CycleOutcome {
        let batch = match self.harvest.run(self.fetcher.as_ref()).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Error in scraping cycle");
                return CycleOutcome::Failed;
            }
        };

        if batch.is_empty() {
            info!("No stories found in this cycle");
            return CycleOutcome::Empty;
        }

        let stored = match self.store.insert_many(&batch.entries).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Could not persist batch; publishing anyway");
                0
            }
        };
        let delivered = self.publisher.publish_to_all(&batch).await;

        info!(stories = batch.len(), stored, delivered, "Scraping cycle completed successfully");
        CycleOutcome::Published { stored, delivered }
    }

    /// Run cycles forever on the configured period.
    pub async fn run(self) {
        info!(period = ?self.period, "Scheduler started");
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
