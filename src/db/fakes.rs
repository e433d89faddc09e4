//! In-memory stand-ins for the redis and postgres stores, injected through
//! the [`CounterStore`] and [`TrendingStore`] seams so pipeline tests run
//! without any backing services.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use crate::db::models::PaginatedResponse;
use crate::db::models::trending::{TrendingEntry, TrendingSnapshot};
use crate::db::redis::counter_store::{CounterResult, CounterStore};
use crate::db::repositories::trending::{SnapshotErr, SnapshotResult, TrendingStore};

/// Counter store over a BTreeMap, so scans come back in a deterministic
/// order.
#[derive(Clone, Default)]
pub struct MemoryCounterStore {
    inner: Arc<Mutex<BTreeMap<String, i64>>>,
}

impl MemoryCounterStore {
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }

    pub fn count(&self, token: &str) -> Option<i64> {
        self.inner.lock().unwrap().get(token).copied()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, token: &str) -> CounterResult<Option<i64>> {
        Ok(self.inner.lock().unwrap().get(token).copied())
    }

    async fn set(&self, token: &str, count: i64) -> CounterResult<()> {
        self.inner.lock().unwrap().insert(token.to_string(), count);
        Ok(())
    }

    async fn delete(&self, token: &str) -> CounterResult<()> {
        self.inner.lock().unwrap().remove(token);
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> CounterResult<Vec<String>> {
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        Ok(self
            .inner
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Counter store whose scan never resolves, for exercising the computation
/// deadline.
#[derive(Clone, Default)]
pub struct HangingCounterStore;

#[async_trait]
impl CounterStore for HangingCounterStore {
    async fn get(&self, _token: &str) -> CounterResult<Option<i64>> {
        futures::future::pending().await
    }

    async fn set(&self, _token: &str, _count: i64) -> CounterResult<()> {
        futures::future::pending().await
    }

    async fn delete(&self, _token: &str) -> CounterResult<()> {
        futures::future::pending().await
    }

    async fn scan(&self, _pattern: &str) -> CounterResult<Vec<String>> {
        futures::future::pending().await
    }
}

/// Snapshot store over a Vec, with one-shot save-failure injection.
#[derive(Clone, Default)]
pub struct MemoryTrendingStore {
    snapshots: Arc<Mutex<Vec<TrendingSnapshot>>>,
    fail_next_save: Arc<AtomicBool>,
}

impl MemoryTrendingStore {
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TrendingStore for MemoryTrendingStore {
    async fn save(&self, entries: &[TrendingEntry]) -> SnapshotResult<TrendingSnapshot> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(SnapshotErr::Invalid("injected save failure".to_string()));
        }

        let mut snapshots = self.snapshots.lock().unwrap();
        let snapshot = TrendingSnapshot {
            id: snapshots.len() as i64 + 1,
            hashtags: entries.to_vec(),
            created_at: Utc::now().naive_utc(),
        };

        snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn latest(&self) -> SnapshotResult<Option<TrendingSnapshot>> {
        Ok(self.snapshots.lock().unwrap().last().cloned())
    }

    async fn history(
        &self,
        limit: i64,
        offset: i64,
    ) -> SnapshotResult<PaginatedResponse<TrendingSnapshot>> {
        let snapshots = self.snapshots.lock().unwrap();
        let total_items = snapshots.len() as i64;

        let items: Vec<TrendingSnapshot> = snapshots
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        let page = if limit > 0 { offset / limit } else { 0 };
        Ok(PaginatedResponse::new(items, total_items, limit, page))
    }
}
