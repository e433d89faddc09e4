use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::instrument;

use crate::db::redis::counter_store::CounterStore;
use crate::db::repositories::trending::TrendingStore;
use crate::trending::compute::TrendingComputer;

/// Drives the computation task on a fixed cadence. This loop is the single
/// owner of the computation path; nothing else runs cycles except the manual
/// trigger route. A failed cycle is logged and waits for the next tick (or a
/// manual trigger), never retried inline.
#[instrument(skip(computer))]
pub fn start_scheduler<C, S>(
    computer: Arc<TrendingComputer<C, S>>,
    period: Duration,
) -> JoinHandle<()>
where
    C: CounterStore + 'static,
    S: TrendingStore + 'static,
{
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);

        // the first tick fires immediately; skip it so a fresh boot does not
        // snapshot an empty window
        tick.tick().await;
        tracing::info!(period_secs = period.as_secs(), "trending scheduler started");

        loop {
            tick.tick().await;

            match computer.run().await {
                Ok(snapshot) => {
                    tracing::info!(
                        snapshot_id = snapshot.id,
                        entry_count = snapshot.hashtags.len(),
                        "scheduled trending cycle complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = ?e, "scheduled trending cycle failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::fakes::{MemoryCounterStore, MemoryTrendingStore};

    #[tokio::test(start_paused = true)]
    async fn test_cycles_run_on_the_interval() {
        let counters = MemoryCounterStore::default();
        counters.set("#ruby", 3).await.unwrap();

        let snapshots = MemoryTrendingStore::default();
        let computer = Arc::new(TrendingComputer::new(
            counters.clone(),
            snapshots.clone(),
            Duration::from_secs(30),
        ));

        let handle = start_scheduler(computer, Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(snapshots.len(), 1);
        assert!(counters.keys().is_empty());

        // next window is empty but still snapshots
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(snapshots.len(), 2);

        handle.abort();
    }
}
