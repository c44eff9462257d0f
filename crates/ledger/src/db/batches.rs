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

//! Batches, tasks and price snapshots. Batch and task status only ever move
//! forward; a batch cannot be finished until every task reached `ready`.

use sqlx::SqliteExecutor;

use super::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum BatchStatus {
    New,
    Processed,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum TaskStatus {
    New,
    Ready,
    Processed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Batch {
    pub batch_id: i64,
    pub ts: i64,
    pub status: BatchStatus,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub protocol_id: String,
    pub batch_id: i64,
    pub height: i64,
    pub jitter: i64,
    pub status: TaskStatus,
    pub ts: i64,
}

pub async fn insert_batch(
    exec: impl SqliteExecutor<'_>,
    ts: i64,
    status: BatchStatus,
) -> Result<i64, DbError> {
    let res = sqlx::query("INSERT INTO batches (ts, status) VALUES ($1, $2)")
        .bind(ts)
        .bind(status)
        .execute(exec)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_batch_by_ts(
    exec: impl SqliteExecutor<'_>,
    ts: i64,
) -> Result<Option<i64>, DbError> {
    Ok(sqlx::query_scalar("SELECT batch_id FROM batches WHERE ts = $1 LIMIT 1")
        .bind(ts)
        .fetch_optional(exec)
        .await?)
}

pub async fn get_batch(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<Option<Batch>, DbError> {
    Ok(sqlx::query_as("SELECT batch_id, ts, status FROM batches WHERE batch_id = $1")
        .bind(batch_id)
        .fetch_optional(exec)
        .await?)
}

pub async fn batch_ts(exec: impl SqliteExecutor<'_>, batch_id: i64) -> Result<i64, DbError> {
    sqlx::query_scalar("SELECT ts FROM batches WHERE batch_id = $1")
        .bind(batch_id)
        .fetch_optional(exec)
        .await?
        .ok_or(DbError::BatchNotFound(batch_id))
}

/// Timestamp of the batch immediately preceding `batch_id`, if any.
pub async fn prev_batch_ts(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<Option<i64>, DbError> {
    Ok(sqlx::query_scalar(
        "SELECT ts FROM batches WHERE batch_id < $1 ORDER BY batch_id DESC LIMIT 1",
    )
    .bind(batch_id)
    .fetch_optional(exec)
    .await?)
}

pub async fn batches_with_status(
    exec: impl SqliteExecutor<'_>,
    status: BatchStatus,
) -> Result<Vec<Batch>, DbError> {
    Ok(sqlx::query_as(
        "SELECT batch_id, ts, status FROM batches WHERE status = $1 ORDER BY batch_id ASC",
    )
    .bind(status)
    .fetch_all(exec)
    .await?)
}

pub async fn list_batches(exec: impl SqliteExecutor<'_>) -> Result<Vec<Batch>, DbError> {
    Ok(sqlx::query_as("SELECT batch_id, ts, status FROM batches ORDER BY batch_id ASC")
        .fetch_all(exec)
        .await?)
}

pub async fn mark_batches_processed(
    exec: impl SqliteExecutor<'_>,
    batch_ids: &[i64],
) -> Result<(), DbError> {
    if batch_ids.is_empty() {
        return Ok(());
    }
    // sqlite has no array binds; the id list is numeric so inlining is safe
    let ids = batch_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    sqlx::query(&format!("UPDATE batches SET status = 'processed' WHERE batch_id IN ({ids})"))
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn insert_task(exec: impl SqliteExecutor<'_>, task: &Task) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO tasks (protocol_id, batch_id, height, jitter, status, ts)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&task.protocol_id)
    .bind(task.batch_id)
    .bind(task.height)
    .bind(task.jitter)
    .bind(task.status)
    .bind(task.ts)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn task_exists(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    batch_id: i64,
    height: i64,
) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks WHERE protocol_id = $1 AND batch_id = $2 AND height = $3",
    )
    .bind(protocol_id)
    .bind(batch_id)
    .bind(height)
    .fetch_one(exec)
    .await?;
    Ok(count > 0)
}

pub async fn batch_has_task_for(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    batch_id: i64,
) -> Result<bool, DbError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE protocol_id = $1 AND batch_id = $2")
            .bind(protocol_id)
            .bind(batch_id)
            .fetch_one(exec)
            .await?;
    Ok(count > 0)
}

/// Oldest `new` task for a protocol, optionally pinned to one batch.
pub async fn find_new_task(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    batch_id: Option<i64>,
) -> Result<Option<Task>, DbError> {
    let query = match batch_id {
        Some(_) => {
            "SELECT protocol_id, batch_id, height, jitter, status, ts FROM tasks
             WHERE protocol_id = $1 AND batch_id = $2 AND status = 'new'
             ORDER BY batch_id ASC LIMIT 1"
        }
        None => {
            "SELECT protocol_id, batch_id, height, jitter, status, ts FROM tasks
             WHERE protocol_id = $1 AND status = 'new'
             ORDER BY batch_id ASC LIMIT 1"
        }
    };
    let mut q = sqlx::query_as(query).bind(protocol_id);
    if let Some(id) = batch_id {
        q = q.bind(id);
    }
    Ok(q.fetch_optional(exec).await?)
}

/// Recorded height of the (batch, protocol) task, for recomputation.
pub async fn task_height(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    batch_id: i64,
) -> Result<Option<i64>, DbError> {
    Ok(sqlx::query_scalar(
        "SELECT height FROM tasks WHERE batch_id = $1 AND protocol_id = $2 LIMIT 1",
    )
    .bind(batch_id)
    .bind(protocol_id)
    .fetch_optional(exec)
    .await?)
}

pub async fn set_task_status(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    batch_id: i64,
    status: TaskStatus,
) -> Result<(), DbError> {
    sqlx::query("UPDATE tasks SET status = $1 WHERE protocol_id = $2 AND batch_id = $3")
        .bind(status)
        .bind(protocol_id)
        .bind(batch_id)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn set_batch_tasks_status(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
    status: TaskStatus,
) -> Result<(), DbError> {
    sqlx::query("UPDATE tasks SET status = $1 WHERE batch_id = $2")
        .bind(status)
        .bind(batch_id)
        .execute(exec)
        .await?;
    Ok(())
}

/// Count of tasks in the batch still outside {ready, processed}.
pub async fn count_not_ready(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<i64, DbError> {
    Ok(sqlx::query_scalar(
        "SELECT COUNT(*) FROM tasks
         WHERE batch_id = $1 AND status NOT IN ('ready', 'processed')",
    )
    .bind(batch_id)
    .fetch_one(exec)
    .await?)
}

/// Lowest batch id that has at least one `ready` task, optionally pinned.
pub async fn batch_with_ready_task(
    exec: impl SqliteExecutor<'_>,
    batch_id: Option<i64>,
) -> Result<Option<i64>, DbError> {
    match batch_id {
        Some(id) => Ok(sqlx::query_scalar(
            "SELECT batch_id FROM tasks WHERE status = 'ready' AND batch_id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_optional(exec)
        .await?),
        None => Ok(sqlx::query_scalar(
            "SELECT batch_id FROM tasks WHERE status = 'ready' ORDER BY batch_id ASC LIMIT 1",
        )
        .fetch_optional(exec)
        .await?),
    }
}

pub async fn tasks_for_batch(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<Vec<Task>, DbError> {
    Ok(sqlx::query_as(
        "SELECT protocol_id, batch_id, height, jitter, status, ts FROM tasks
         WHERE batch_id = $1 ORDER BY protocol_id",
    )
    .bind(batch_id)
    .fetch_all(exec)
    .await?)
}

pub async fn insert_price(
    exec: impl SqliteExecutor<'_>,
    asset_id: &str,
    batch_id: i64,
    price: f64,
    ts: i64,
) -> Result<(), DbError> {
    // once snapshotted for a batch a price is immutable; re-preparing the
    // same timestamp must not move it
    sqlx::query("INSERT OR IGNORE INTO prices (asset_id, batch_id, price, ts) VALUES ($1, $2, $3, $4)")
        .bind(asset_id)
        .bind(batch_id)
        .bind(price)
        .bind(ts)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn prices_for_batch(
    exec: impl SqliteExecutor<'_>,
    batch_id: i64,
) -> Result<Vec<(String, f64)>, DbError> {
    Ok(sqlx::query_as("SELECT asset_id, price FROM prices WHERE batch_id = $1")
        .bind(batch_id)
        .fetch_all(exec)
        .await?)
}
