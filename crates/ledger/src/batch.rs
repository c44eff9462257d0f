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

//! Batch lifecycle and task tracking.
//!
//! `prepare_batch` performs all network discovery (chain heights, oracle
//! prices) before opening the write transaction, so the batch, its tasks and
//! its price snapshot land atomically.

use std::collections::BTreeSet;

use sqlx::SqliteConnection;

use crate::{
    db::{
        batches::{self, BatchStatus, Task, TaskStatus},
        schedule, Db, DbError,
    },
    pricefeed::PriceFeed,
    source::SourceObj,
    LedgerError,
};

/// Everything the tracker needs to open a task for one configured protocol.
pub struct ProtocolPlan {
    pub protocol_id: String,
    /// Maximum height offset; the shared per-cycle draw scales it.
    pub jitter: u64,
    /// Configured asset ids whose prices are snapshotted for the batch.
    pub assets: Vec<String>,
    pub source: SourceObj,
}

#[derive(Debug)]
pub struct PrepareOutcome {
    pub batch_id: i64,
    pub reused_batch: bool,
    pub tasks_created: usize,
    pub prices_snapshotted: usize,
}

/// Opens the batch for `ts`, reusing an existing row with the identical
/// timestamp instead of duplicating it.
pub async fn open_batch(
    conn: &mut SqliteConnection,
    ts: i64,
    status: BatchStatus,
) -> Result<(i64, bool), LedgerError> {
    if let Some(batch_id) = batches::find_batch_by_ts(&mut *conn, ts).await? {
        tracing::info!("reusing existing batch {batch_id} for timestamp {ts}");
        return Ok((batch_id, true));
    }
    let batch_id = batches::insert_batch(&mut *conn, ts, status).await?;
    Ok((batch_id, false))
}

/// Opens a batch at `ts` and creates one task per schedule-active protocol,
/// plus the batch's price snapshot.
///
/// `time_shift` is the single per-cycle uniform draw in `[0, 1)`; every
/// protocol's jitter window is scaled by the same fraction so cross-chain
/// sampling stays correlated.
pub async fn prepare_batch(
    db: &Db,
    plans: &[ProtocolPlan],
    pricefeed: &dyn PriceFeed,
    pricefeed_jitter: u64,
    ts: i64,
    time_shift: f64,
) -> Result<PrepareOutcome, LedgerError> {
    let active = schedule::active_protocols(db.pool(), ts).await?;
    if active.is_empty() {
        return Err(LedgerError::NoActiveProtocols(ts));
    }

    // Height discovery happens before any row is written; a failing adapter
    // aborts the step with the store untouched.
    let mut pending_tasks = Vec::new();
    let mut assets_to_price = BTreeSet::new();
    for protocol_id in &active {
        let plan = plans
            .iter()
            .find(|p| &p.protocol_id == protocol_id)
            .ok_or_else(|| LedgerError::UnknownProtocol(protocol_id.clone()))?;

        let jitter = (plan.jitter as f64 * time_shift) as i64;
        if jitter == 0 {
            tracing::warn!("jitter is 0 for protocol {protocol_id}");
        }

        let height = plan.source.get_last_block_height().await? as i64;
        tracing::debug!("got height {height} for protocol {protocol_id}");

        assets_to_price.extend(plan.assets.iter().cloned());
        pending_tasks.push(Task {
            protocol_id: protocol_id.clone(),
            batch_id: 0,
            height: height - jitter,
            jitter,
            status: TaskStatus::New,
            ts,
        });
    }

    let pricefeed_height = pricefeed.get_last_height().await?;
    tracing::debug!("got pricefeed height {pricefeed_height}");
    let price_height = pricefeed_height.saturating_sub((pricefeed_jitter as f64 * time_shift) as u64);
    let mut prices = Vec::new();
    for asset_id in &assets_to_price {
        let price = pricefeed.get_price(asset_id, price_height).await?;
        prices.push((asset_id.clone(), price));
    }

    let mut tx = db.begin().await?;
    let (batch_id, reused_batch) = open_batch(&mut *tx, ts, BatchStatus::New).await?;

    let mut tasks_created = 0;
    for mut task in pending_tasks {
        if batches::batch_has_task_for(&mut *tx, &task.protocol_id, batch_id).await? {
            tracing::info!("task already exists for protocol {} in batch {batch_id}", task.protocol_id);
            continue;
        }
        task.batch_id = batch_id;
        batches::insert_task(&mut *tx, &task).await?;
        tasks_created += 1;
    }

    let prices_snapshotted = prices.len();
    for (asset_id, price) in prices {
        batches::insert_price(&mut *tx, &asset_id, batch_id, price, ts).await?;
    }
    tx.commit().await.map_err(DbError::from)?;

    tracing::info!("prepared batch {batch_id}: {tasks_created} tasks, {prices_snapshotted} prices");
    Ok(PrepareOutcome { batch_id, reused_batch, tasks_created, prices_snapshotted })
}

#[derive(Debug)]
pub struct ManualTaskOutcome {
    pub batch_id: i64,
    pub tasks_created: usize,
}

/// Inserts tasks at an operator-supplied height, bypassing height discovery.
/// Idempotent per (protocol, batch, height): identical re-runs insert nothing.
pub async fn create_manual_tasks(
    db: &Db,
    ts: i64,
    height: i64,
    jitter: i64,
) -> Result<ManualTaskOutcome, LedgerError> {
    let mut tx = db.begin().await?;

    let protocols = schedule::enabled_protocols(&mut *tx).await?;
    if protocols.is_empty() {
        return Err(LedgerError::NoActiveProtocols(ts));
    }

    let (batch_id, _) = open_batch(&mut *tx, ts, BatchStatus::Manual).await?;

    let mut tasks_created = 0;
    for protocol_id in protocols {
        if batches::task_exists(&mut *tx, &protocol_id, batch_id, height).await? {
            tracing::info!("task already exists for protocol {protocol_id}");
            continue;
        }
        batches::insert_task(
            &mut *tx,
            &Task {
                protocol_id: protocol_id.clone(),
                batch_id,
                height,
                jitter,
                status: TaskStatus::New,
                ts,
            },
        )
        .await?;
        tracing::info!("inserted new task for protocol {protocol_id}");
        tasks_created += 1;
    }

    tx.commit().await.map_err(DbError::from)?;
    Ok(ManualTaskOutcome { batch_id, tasks_created })
}

/// True iff no task in the batch has a status outside {ready, processed}.
pub async fn check_all_ready(db: &Db, batch_id: i64) -> Result<bool, LedgerError> {
    Ok(batches::count_not_ready(db.pool(), batch_id).await? == 0)
}

pub async fn mark_processed(db: &Db, batch_ids: &[i64]) -> Result<(), LedgerError> {
    batches::mark_batches_processed(db.pool(), batch_ids).await?;
    Ok(())
}
