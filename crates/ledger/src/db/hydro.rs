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

//! Hydro reward allocations, grouped per import; each row is consumed into
//! the public ledger exactly once via the `processed` flag.

use sqlx::SqliteExecutor;

use super::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HydroAllocation {
    pub id: i64,
    pub address: String,
    pub reward: i64,
    pub group_id: i64,
    pub processed: bool,
}

pub async fn next_group_id(exec: impl SqliteExecutor<'_>) -> Result<i64, DbError> {
    let last: Option<i64> = sqlx::query_scalar("SELECT MAX(group_id) FROM hydro_allocations")
        .fetch_one(exec)
        .await?;
    Ok(last.unwrap_or(0) + 1)
}

pub async fn insert_allocation(
    exec: impl SqliteExecutor<'_>,
    group_id: i64,
    address: &str,
    reward: i64,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO hydro_allocations (address, reward, group_id) VALUES ($1, $2, $3)")
        .bind(address)
        .bind(reward)
        .bind(group_id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn unprocessed_allocations(
    exec: impl SqliteExecutor<'_>,
    group_id: i64,
) -> Result<Vec<HydroAllocation>, DbError> {
    Ok(sqlx::query_as(
        "SELECT id, address, reward, group_id, processed FROM hydro_allocations
         WHERE group_id = $1 AND processed = 0 ORDER BY id",
    )
    .bind(group_id)
    .fetch_all(exec)
    .await?)
}

pub async fn mark_allocation_processed(
    exec: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<(), DbError> {
    sqlx::query("UPDATE hydro_allocations SET processed = 1 WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(())
}
