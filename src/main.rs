use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;

use crate::db::prelude::*;
use crate::ingest::queue::IngestJob;
use crate::trending::compute::TrendingComputer;
use crate::util::env::Var;
use crate::util::telemetry;

mod api;
mod db;
mod ingest;
mod trending;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Std(#[from] Box<dyn std::error::Error>),

    #[error(transparent)]
    Env(#[from] util::env::EnvErr),

    #[error(transparent)]
    Pg(#[from] PgError),

    #[error(transparent)]
    Counter(#[from] CounterErr),

    #[error(transparent)]
    Route(#[from] api::server::RouteError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_registry = telemetry::Telemetry::new().await?.register();

    tracing::info!("starting main application");

    let interval_secs = var!(Var::TrendingIntervalSecs)
        .await?
        .parse::<u64>()
        .unwrap();
    let deadline_secs = var!(Var::ScanDeadlineSecs).await?.parse::<u64>().unwrap();

    let pool = db_pool().await?;
    let counters = RedisCounterStore::new().await?;
    let computer = Arc::new(TrendingComputer::new(
        counters.clone(),
        PgTrendingRepository::new(pool),
        Duration::from_secs(deadline_secs),
    ));

    let (tx_server_ready, rx_server_ready) = tokio::sync::mpsc::unbounded_channel::<SocketAddr>();
    let (tx_ingest, rx_ingest) = tokio::sync::mpsc::unbounded_channel::<IngestJob>();

    let mut handles = Vec::new();

    handles.push(ingest::queue::start_ingest_worker(counters, rx_ingest));
    handles.push(trending::scheduler::start_scheduler(
        computer.clone(),
        Duration::from_secs(interval_secs),
    ));

    let server_handles =
        api::server::start_server(tx_server_ready, tx_ingest, computer, rx_server_ready).await?;
    handles.extend(server_handles);

    _ = join_all(handles).await;

    telemetry_registry.shutdown();
    Ok(())
}
