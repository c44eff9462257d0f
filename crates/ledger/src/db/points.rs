// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-batch point deltas and the cumulative public ledger.

use sqlx::SqliteExecutor;

use super::DbError;

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PublicRow {
    pub address: String,
    pub asset_id: String,
    pub points: i64,
    pub change: i64,
    pub prev_points_l1: i64,
    pub prev_points_l2: i64,
    pub points_l1: i64,
    pub points_l2: i64,
    pub place: i64,
    pub prev_place: i64,
}

pub async fn delete_points(exec: impl SqliteExecutor<'_>, batch_id: i64) -> Result<u64, DbError> {
    let res =
        sqlx::query("DELETE FROM user_points WHERE batch_id = $1").bind(batch_id).execute(exec).await?;
    Ok(res.rows_affected())
}

pub async fn insert_points(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
    address: &str,
    asset_id: &str,
    points: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT OR REPLACE INTO user_points (batch_id, address, asset_id, points)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(batch_id)
    .bind(address)
    .bind(asset_id)
    .bind(points)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn points_for_batch(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<Vec<(String, String, i64)>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, asset_id, points FROM user_points WHERE batch_id = $1
         ORDER BY address, asset_id",
    )
    .bind(batch_id)
    .fetch_all(exec)
    .await?)
}

/// (address, asset, summed points) across the given batches.
pub async fn sum_points(
    exec: impl SqliteExecutor<'_>,
    batch_ids: &[i64],
) -> Result<Vec<(String, String, i64)>, DbError> {
    if batch_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = batch_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    Ok(sqlx::query_as(&format!(
        "SELECT address, asset_id, SUM(points) FROM user_points
         WHERE batch_id IN ({ids})
         GROUP BY address, asset_id"
    ))
    .fetch_all(exec)
    .await?)
}

pub async fn zero_change(exec: impl SqliteExecutor<'_>) -> Result<(), DbError> {
    sqlx::query("UPDATE user_points_public SET change = 0").execute(exec).await?;
    Ok(())
}

/// Insert-or-accumulate one folded delta into the public ledger.
pub async fn upsert_fold(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    asset_id: &str,
    delta: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_points_public (address, asset_id, points, change)
         VALUES ($1, $2, $3, $3)
         ON CONFLICT (address, asset_id) DO UPDATE SET
             points = user_points_public.points + excluded.points,
             change = excluded.change",
    )
    .bind(address)
    .bind(asset_id)
    .bind(delta)
    .execute(exec)
    .await?;
    Ok(())
}

/// Zero-valued row so referral bonuses have something to credit.
pub async fn seed_row(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    asset_id: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT OR IGNORE INTO user_points_public (address, asset_id, points, change)
         VALUES ($1, $2, 0, 0)",
    )
    .bind(address)
    .bind(asset_id)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn snapshot_prev_bonus(exec: impl SqliteExecutor<'_>) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE user_points_public SET prev_points_l1 = points_l1, prev_points_l2 = points_l2",
    )
    .execute(exec)
    .await?;
    Ok(())
}

/// Adds the L1/L2 bonus deltas to every asset row of a referrer.
pub async fn add_bonus(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    l1_delta: i64,
    l2_delta: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE user_points_public
         SET points_l1 = points_l1 + $1, points_l2 = points_l2 + $2
         WHERE address = $3",
    )
    .bind(l1_delta)
    .bind(l2_delta)
    .bind(address)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn apply_bonus_to_change(exec: impl SqliteExecutor<'_>) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE user_points_public
         SET change = change + (points_l1 + points_l2) - (prev_points_l1 + prev_points_l2)",
    )
    .execute(exec)
    .await?;
    Ok(())
}

/// Per-address change totals, used for bonus propagation.
pub async fn change_by_address(
    exec: impl SqliteExecutor<'_>,
) -> Result<Vec<(String, i64)>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, SUM(change) FROM user_points_public GROUP BY address",
    )
    .fetch_all(exec)
    .await?)
}

/// Per-address grand totals (points + both bonus tiers), highest first.
pub async fn totals_by_address(
    exec: impl SqliteExecutor<'_>,
) -> Result<Vec<(String, i64)>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, SUM(points + points_l1 + points_l2) AS total
         FROM user_points_public GROUP BY address
         ORDER BY total DESC, address ASC",
    )
    .fetch_all(exec)
    .await?)
}

pub async fn set_place(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    place: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE user_points_public SET prev_place = place, place = $1 WHERE address = $2",
    )
    .bind(place)
    .bind(address)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn rows_for_address(
    exec: impl SqliteExecutor<'_>,
    address: &str,
) -> Result<Vec<PublicRow>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, asset_id, points, change, prev_points_l1, prev_points_l2,
                points_l1, points_l2, place, prev_place
         FROM user_points_public WHERE address = $1 ORDER BY asset_id",
    )
    .bind(address)
    .fetch_all(exec)
    .await?)
}

/// Rows for one (address, asset) pairing. More than one row here means the
/// unique index was bypassed and the ledger is corrupt.
pub async fn rows_for_address_asset(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    asset_id: &str,
) -> Result<Vec<PublicRow>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, asset_id, points, change, prev_points_l1, prev_points_l2,
                points_l1, points_l2, place, prev_place
         FROM user_points_public WHERE address = $1 AND asset_id = $2",
    )
    .bind(address)
    .bind(asset_id)
    .fetch_all(exec)
    .await?)
}

pub async fn add_points_and_change(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    asset_id: &str,
    delta: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE user_points_public
         SET points = points + $1, change = change + $1
         WHERE address = $2 AND asset_id = $3",
    )
    .bind(delta)
    .bind(address)
    .bind(asset_id)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn insert_public_row(
    exec: impl SqliteExecutor<'_>,
    address: &str,
    asset_id: &str,
    points: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_points_public (address, asset_id, points, change)
         VALUES ($1, $2, $3, $3)",
    )
    .bind(address)
    .bind(asset_id)
    .bind(points)
    .execute(exec)
    .await?;
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub address: String,
    pub points: i64,
    pub points_l1: i64,
    pub points_l2: i64,
    pub change: i64,
    pub place: i64,
    pub prev_place: i64,
}

/// Rank-ordered per-address aggregation for the read API.
pub async fn leaderboard(
    exec: impl SqliteExecutor<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<LeaderboardEntry>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address,
                SUM(points) AS points,
                SUM(points_l1) AS points_l1,
                SUM(points_l2) AS points_l2,
                SUM(change) AS change,
                MIN(place) AS place,
                MIN(prev_place) AS prev_place
         FROM user_points_public
         GROUP BY address
         ORDER BY place ASC
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(exec)
    .await?)
}
