use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One ranked (hashtag, count) pair inside a snapshot. The hashtag text and
/// its count are denormalized at computation time; nothing links back to the
/// counter keys afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub hashtag: String,
    pub count: i64,
}

/// Immutable, timestamped ranking produced by one computation cycle.
/// Entries are ordered by count descending and there are at most
/// [`TRENDING_SIZE`](crate::trending::compute::TRENDING_SIZE) of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingSnapshot {
    pub id: i64,
    pub hashtags: Vec<TrendingEntry>,
    pub created_at: NaiveDateTime,
}

/// Base trending table row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendingRow {
    pub id: i64,
    pub hashtags: sqlx::types::Json<Vec<TrendingEntry>>,
    pub created_at: NaiveDateTime,
}

impl From<TrendingRow> for TrendingSnapshot {
    fn from(row: TrendingRow) -> Self {
        Self {
            id: row.id,
            hashtags: row.hashtags.0,
            created_at: row.created_at,
        }
    }
}
