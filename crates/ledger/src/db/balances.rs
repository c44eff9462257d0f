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

//! Raw per-address balance snapshots, one row per (batch, protocol, asset,
//! address). Balances are stored as 6-decimal human-readable strings.

use sqlx::SqliteExecutor;

use super::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BalanceRow {
    pub batch_id: i64,
    pub address: String,
    pub protocol_id: String,
    pub height: i64,
    pub asset: String,
    pub balance: String,
}

pub async fn insert_balance(
    exec: impl SqliteExecutor<'_>,
    row: &BalanceRow,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_balances (batch_id, address, protocol_id, height, asset, balance)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(row.batch_id)
    .bind(&row.address)
    .bind(&row.protocol_id)
    .bind(row.height)
    .bind(&row.asset)
    .bind(&row.balance)
    .execute(exec)
    .await?;
    Ok(())
}

/// Drops the (batch, protocol) snapshot ahead of a re-ingest.
pub async fn delete_balances(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
    protocol_id: &str,
) -> Result<u64, DbError> {
    let res = sqlx::query("DELETE FROM user_balances WHERE batch_id = $1 AND protocol_id = $2")
        .bind(batch_id)
        .bind(protocol_id)
        .execute(exec)
        .await?;
    Ok(res.rows_affected())
}

/// Balance rows for a batch with blacklisted addresses already excluded.
pub async fn balances_for_points(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<Vec<(String, String, String)>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, asset, balance FROM user_balances
         WHERE batch_id = $1
           AND address NOT IN (SELECT address FROM blacklist)",
    )
    .bind(batch_id)
    .fetch_all(exec)
    .await?)
}
