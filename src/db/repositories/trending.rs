use async_trait::async_trait;
use sqlx::{PgPool, Pool, Postgres};
use thiserror::Error;
use tracing::instrument;

use crate::db::models::PaginatedResponse;
use crate::db::models::trending::{TrendingEntry, TrendingRow, TrendingSnapshot};
use crate::trending::compute::TRENDING_SIZE;

const TRENDING_FIELDS: &str = r#"
    id,
    hashtags,
    created_at
"#;

/// Append-only history of trending snapshots. `save` assigns the timestamp
/// at persistence time and returns the stored record; a snapshot is never
/// mutated once written.
#[async_trait]
pub trait TrendingStore: Send + Sync {
    async fn save(&self, entries: &[TrendingEntry]) -> SnapshotResult<TrendingSnapshot>;
    async fn latest(&self) -> SnapshotResult<Option<TrendingSnapshot>>;
    async fn history(
        &self,
        limit: i64,
        offset: i64,
    ) -> SnapshotResult<PaginatedResponse<TrendingSnapshot>>;
}

pub struct PgTrendingRepository {
    pool: &'static Pool<Postgres>,
}

impl PgTrendingRepository {
    pub fn new(pool: &'static PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrendingStore for PgTrendingRepository {
    #[instrument(skip(self, entries), fields(entry_count = entries.len()))]
    async fn save(&self, entries: &[TrendingEntry]) -> SnapshotResult<TrendingSnapshot> {
        if entries.len() > TRENDING_SIZE {
            return Err(SnapshotErr::Invalid(format!(
                "ranking holds {} entries, at most {} allowed",
                entries.len(),
                TRENDING_SIZE
            )));
        }

        let row = sqlx::query_as::<_, TrendingRow>(&format!(
            r#"
            INSERT INTO trending (hashtags, created_at)
            VALUES ($1, NOW())
            RETURNING {TRENDING_FIELDS}
            "#
        ))
        .bind(sqlx::types::Json(entries.to_vec()))
        .fetch_one(self.pool)
        .await;

        match row {
            Ok(row) => {
                tracing::info!(snapshot_id = row.id, "persisted trending snapshot");
                Ok(row.into())
            }
            Err(e) => {
                tracing::error!(error = ?e, "snapshot insert failure");
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn latest(&self) -> SnapshotResult<Option<TrendingSnapshot>> {
        let row = sqlx::query_as::<_, TrendingRow>(&format!(
            "SELECT {TRENDING_FIELDS} FROM trending ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(TrendingSnapshot::from))
    }

    #[instrument(skip(self))]
    async fn history(
        &self,
        limit: i64,
        offset: i64,
    ) -> SnapshotResult<PaginatedResponse<TrendingSnapshot>> {
        let total_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trending")
            .fetch_one(self.pool)
            .await?;

        let rows = sqlx::query_as::<_, TrendingRow>(&format!(
            r#"
            SELECT {TRENDING_FIELDS} FROM trending
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let snapshots = rows.into_iter().map(TrendingSnapshot::from).collect();
        let page = if limit > 0 { offset / limit } else { 0 };
        Ok(PaginatedResponse::new(snapshots, total_items, limit, page))
    }
}

pub type SnapshotResult<T> = core::result::Result<T, SnapshotErr>;

#[derive(Debug, Error)]
pub enum SnapshotErr {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error("snapshot rejected: {0}")]
    Invalid(String),
}
