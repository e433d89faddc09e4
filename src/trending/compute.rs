use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::instrument;

use crate::db::models::trending::{TrendingEntry, TrendingSnapshot};
use crate::db::redis::counter_store::{CounterErr, CounterStore};
use crate::db::repositories::trending::{SnapshotErr, TrendingStore};

/// Number of ranked entries a snapshot carries.
pub const TRENDING_SIZE: usize = 5;

/// Token glob handed to the counter scan; every counter key is a hashtag.
pub const HASHTAG_KEY_PATTERN: &str = "#*";

/// One computation cycle over the shared counters: scan, read, rank,
/// persist, reset.
///
/// The read phase is a live scan, not an isolated view. Increments that land
/// between the scan and the reset are deleted with everything else, so the
/// next window silently undercounts them. Callers that need exact counts
/// cannot get them from this pipeline.
pub struct TrendingComputer<C, S> {
    counters: C,
    snapshots: S,
    scan_deadline: Duration,
}

impl<C, S> TrendingComputer<C, S>
where
    C: CounterStore,
    S: TrendingStore,
{
    pub fn new(counters: C, snapshots: S, scan_deadline: Duration) -> Self {
        Self {
            counters,
            snapshots,
            scan_deadline,
        }
    }

    /// Runs one cycle. Counter keys are deleted only after the snapshot is
    /// durable; any failure before that point leaves every counter in
    /// place and surfaces to the caller, who decides when to re-trigger.
    #[instrument(skip(self))]
    pub async fn run(&self) -> TrendingResult<TrendingSnapshot> {
        let (keys, counts) = timeout(self.scan_deadline, self.collect_counts())
            .await
            .map_err(|_| TrendingErr::ScanDeadline(self.scan_deadline))??;

        tracing::debug!(
            scanned_keys = keys.len(),
            live_counters = counts.len(),
            "collected counter state"
        );

        let ranked = rank_hashtags(counts);
        let snapshot = match self.snapshots.save(&ranked).await {
            Ok(snapshot) => snapshot,
            Err(source) => {
                return Err(TrendingErr::Persistence {
                    entries: ranked,
                    source,
                });
            }
        };

        for key in &keys {
            self.counters.delete(key).await?;
        }

        tracing::info!(
            snapshot_id = snapshot.id,
            entry_count = snapshot.hashtags.len(),
            reset_keys = keys.len(),
            "trending cycle complete"
        );

        Ok(snapshot)
    }

    /// Read phase: enumerate counter keys, then read each one. A key that
    /// vanishes between the scan and its read counts as 0 but stays on the
    /// reset list.
    async fn collect_counts(&self) -> TrendingResult<(Vec<String>, Vec<(String, i64)>)> {
        let keys = self.counters.scan(HASHTAG_KEY_PATTERN).await?;

        let mut counts = Vec::with_capacity(keys.len());
        for key in &keys {
            let count = self.counters.get(key).await?.unwrap_or(0);
            counts.push((key.clone(), count));
        }

        Ok((keys, counts))
    }
}

/// Ranks hashtags by count descending, ties broken by token ascending, and
/// keeps the top [`TRENDING_SIZE`]. Zero counts are equivalent to absent
/// counters and never rank.
pub fn rank_hashtags(mut counts: Vec<(String, i64)>) -> Vec<TrendingEntry> {
    counts.retain(|(_, count)| *count > 0);
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    counts
        .into_iter()
        .take(TRENDING_SIZE)
        .map(|(hashtag, count)| TrendingEntry { hashtag, count })
        .collect()
}

pub type TrendingResult<T> = core::result::Result<T, TrendingErr>;

#[derive(Debug, Error)]
pub enum TrendingErr {
    #[error(transparent)]
    Counter(#[from] CounterErr),

    #[error("failed to persist snapshot of {} ranked hashtags: {source}", .entries.len())]
    Persistence {
        entries: Vec<TrendingEntry>,
        source: SnapshotErr,
    },

    #[error("counter scan exceeded the {0:?} deadline")]
    ScanDeadline(Duration),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::fakes::{HangingCounterStore, MemoryCounterStore, MemoryTrendingStore};

    const DEADLINE: Duration = Duration::from_secs(30);

    async fn seed(store: &MemoryCounterStore, counts: &[(&str, i64)]) {
        for (tag, count) in counts {
            store.set(tag, *count).await.unwrap();
        }
    }

    #[test]
    fn test_rank_orders_by_count_descending() {
        let ranked = rank_hashtags(vec![
            ("#low".to_string(), 1),
            ("#high".to_string(), 10),
            ("#mid".to_string(), 5),
        ]);

        let counts: Vec<i64> = ranked.iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![10, 5, 1]);
    }

    #[test]
    fn test_rank_caps_at_five() {
        let counts = (1..=8)
            .map(|n| (format!("#tag{n}"), n as i64))
            .collect::<Vec<_>>();

        let ranked = rank_hashtags(counts);
        assert_eq!(ranked.len(), TRENDING_SIZE);
        assert_eq!(ranked[0].count, 8);
        assert_eq!(ranked[4].count, 4);
    }

    #[test]
    fn test_rank_ties_break_lexicographically() {
        let ranked = rank_hashtags(vec![
            ("#zebra".to_string(), 7),
            ("#apple".to_string(), 7),
            ("#mango".to_string(), 7),
        ]);

        let tags: Vec<&str> = ranked.iter().map(|e| e.hashtag.as_str()).collect();
        assert_eq!(tags, vec!["#apple", "#mango", "#zebra"]);
    }

    #[test]
    fn test_rank_drops_zero_counts() {
        let ranked = rank_hashtags(vec![
            ("#silent".to_string(), 0),
            ("#spoken".to_string(), 1),
        ]);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].hashtag, "#spoken");
    }

    #[tokio::test]
    async fn test_cycle_snapshots_top_five_and_resets() {
        let counters = MemoryCounterStore::default();
        seed(
            &counters,
            &[
                ("#a", 10),
                ("#b", 7),
                ("#c", 7),
                ("#d", 3),
                ("#e", 2),
                ("#f", 1),
            ],
        )
        .await;

        let snapshots = MemoryTrendingStore::default();
        let computer = TrendingComputer::new(counters.clone(), snapshots.clone(), DEADLINE);

        let snapshot = computer.run().await.unwrap();

        let expected: Vec<(&str, i64)> =
            vec![("#a", 10), ("#b", 7), ("#c", 7), ("#d", 3), ("#e", 2)];
        let actual: Vec<(&str, i64)> = snapshot
            .hashtags
            .iter()
            .map(|e| (e.hashtag.as_str(), e.count))
            .collect();

        assert_eq!(actual, expected);
        assert_eq!(snapshots.len(), 1);

        // every key present at scan start is gone
        assert!(counters.keys().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_preserves_counters() {
        let counters = MemoryCounterStore::default();
        seed(&counters, &[("#keep", 4), ("#also", 2)]).await;

        let snapshots = MemoryTrendingStore::default();
        snapshots.fail_next_save();

        let computer = TrendingComputer::new(counters.clone(), snapshots.clone(), DEADLINE);
        let err = computer.run().await.unwrap_err();

        match err {
            TrendingErr::Persistence { entries, .. } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].hashtag, "#keep");
            }
            other => panic!("expected a persistence error, got {other:?}"),
        }

        assert_eq!(counters.count("#keep"), Some(4));
        assert_eq!(counters.count("#also"), Some(2));
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_empty_counter_state_still_snapshots() {
        let counters = MemoryCounterStore::default();
        let snapshots = MemoryTrendingStore::default();
        let computer = TrendingComputer::new(counters, snapshots.clone(), DEADLINE);

        let snapshot = computer.run().await.unwrap();
        assert!(snapshot.hashtags.is_empty());
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_store_hits_the_scan_deadline() {
        let snapshots = MemoryTrendingStore::default();
        let computer = TrendingComputer::new(
            HangingCounterStore,
            snapshots.clone(),
            Duration::from_secs(5),
        );

        let err = computer.run().await.unwrap_err();
        assert!(matches!(err, TrendingErr::ScanDeadline(_)));
        assert!(snapshots.is_empty());
    }
}
