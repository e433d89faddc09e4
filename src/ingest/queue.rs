use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::instrument;
use uuid::Uuid;

use crate::db::redis::counter_store::CounterStore;
use crate::ingest::task::ingest_content;

/// One unit of ingestion work: the body of a single posted content item.
/// The id exists for log correlation only; jobs are not deduplicated by it.
#[derive(Debug)]
pub struct IngestJob {
    pub id: Uuid,
    pub body: String,
}

impl IngestJob {
    pub fn new(body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            body,
        }
    }
}

/// Drains the ingest queue, spawning one task per job so bodies are
/// processed concurrently. Producers fire-and-forget into the channel; a
/// failed job is logged loudly and dropped, retry policy belongs to
/// whoever enqueues.
#[instrument(skip(store, rx))]
pub fn start_ingest_worker<C>(store: C, mut rx: UnboundedReceiver<IngestJob>) -> JoinHandle<()>
where
    C: CounterStore + Clone + 'static,
{
    tokio::spawn(async move {
        tracing::debug!("ingest worker started");

        while let Some(job) = rx.recv().await {
            let store = store.clone();
            tokio::spawn(async move {
                if let Err(e) = ingest_content(&store, &job).await {
                    tracing::error!(job_id = %job.id, error = ?e, "ingest job failed");
                }
            });
        }

        tracing::info!("ingest queue closed, worker stopping");
    })
}
