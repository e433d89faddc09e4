use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::instrument;

use crate::db::redis::redis_pool;
use crate::util::env::EnvErr;

/// Prefix for per-hashtag counter keys, so the counters share a redis
/// database with anything else without colliding. The token itself keeps its
/// leading `#`.
const COUNTER_NAMESPACE: &str = "hashtag:";

fn counter_key(token: &str) -> String {
    format!("{COUNTER_NAMESPACE}{token}")
}

fn counter_wildcard(pattern: &str) -> String {
    format!("{COUNTER_NAMESPACE}{pattern}")
}

/// Shared per-hashtag counter state, keyed by hashtag token (leading `#`
/// included, case-sensitive). Both pipeline stages consume this seam; tests
/// substitute an in-memory fake.
///
/// `scan` takes the token glob (`#*`) and yields bare tokens in store order.
/// There is no increment primitive here: callers that mutate do their own
/// get-then-set, which is not atomic across concurrent writers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, token: &str) -> CounterResult<Option<i64>>;
    async fn set(&self, token: &str, count: i64) -> CounterResult<()>;
    async fn delete(&self, token: &str) -> CounterResult<()>;
    async fn scan(&self, pattern: &str) -> CounterResult<Vec<String>>;
}

#[derive(Clone)]
pub struct RedisCounterStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisCounterStore {
    pub async fn new() -> CounterResult<Self> {
        let manager = redis_pool().await?.manager.clone();
        Ok(Self { manager })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    #[instrument(skip(self))]
    async fn get(&self, token: &str) -> CounterResult<Option<i64>> {
        let mut conn = self.manager.clone();
        let count: Option<i64> = conn.get(counter_key(token)).await?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn set(&self, token: &str, count: i64) -> CounterResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.set(counter_key(token), count).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, token: &str) -> CounterResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(counter_key(token)).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn scan(&self, pattern: &str) -> CounterResult<Vec<String>> {
        let mut conn = self.manager.clone();
        let keys_raw: Vec<String> = conn.keys(counter_wildcard(pattern)).await?;

        let tokens: Vec<String> = keys_raw
            .iter()
            .filter_map(|key| key.strip_prefix(COUNTER_NAMESPACE).map(str::to_owned))
            .collect();

        if tokens.len() != keys_raw.len() {
            tracing::warn!(
                raw_count = keys_raw.len(),
                token_count = tokens.len(),
                "some scanned keys did not carry the counter namespace"
            );
        }

        tracing::debug!(token_count = tokens.len(), "scanned counter keys");
        Ok(tokens)
    }
}

pub type CounterResult<T> = core::result::Result<T, CounterErr>;

#[derive(Debug, Error)]
pub enum CounterErr {
    #[error(transparent)]
    EnvErr(#[from] EnvErr),

    #[error(transparent)]
    RedisClientError(#[from] redis::RedisError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counter_keys_are_namespaced() {
        assert_eq!(counter_key("#ruby"), "hashtag:#ruby");
        assert_eq!(counter_wildcard("#*"), "hashtag:#*");
    }
}
