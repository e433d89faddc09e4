use thiserror::Error;
use tracing::instrument;

use crate::db::redis::counter_store::{CounterErr, CounterStore};
use crate::ingest::lexer::extract_hashtags;
use crate::ingest::queue::IngestJob;

/// Folds one posted content body into the shared hashtag counters.
///
/// Each extracted token is a separate get-then-set (absent key reads as 0).
/// The read-modify-write is not atomic: two workers racing on the same tag
/// can drop an increment, and a redelivered job counts its tags again. Store
/// errors propagate to the worker loop; nothing is retried here.
#[instrument(skip(store, job), fields(job_id = %job.id))]
pub async fn ingest_content<C: CounterStore>(store: &C, job: &IngestJob) -> IngestResult<()> {
    let tags = extract_hashtags(&job.body);
    if tags.is_empty() {
        tracing::debug!("no hashtags in content body");
        return Ok(());
    }

    tracing::debug!(tag_count = tags.len(), "incrementing hashtag counters");
    for tag in tags {
        let current = store.get(tag).await?.unwrap_or(0);
        store.set(tag, current + 1).await?;
    }

    Ok(())
}

pub type IngestResult<T> = core::result::Result<T, IngestErr>;

#[derive(Debug, Error)]
pub enum IngestErr {
    #[error(transparent)]
    CounterStore(#[from] CounterErr),
}
