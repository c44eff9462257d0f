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

//! Points ledger engine: converts a batch's balance and price snapshots into
//! per-(address, asset-family) point deltas.

use std::collections::{BTreeMap, HashMap};

use sqlx::SqliteConnection;

use crate::{
    db::{
        balances, batches,
        batches::TaskStatus,
        points as points_db, Db, DbError,
    },
    publish::{self, PublishParams, PublishStats},
    LedgerError,
};

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Strips the trailing `_SUFFIX` denomination qualifier, so `dATOM_NTRN` and
/// `dATOM_USDC` both roll into the `dATOM` family.
pub fn asset_family(asset: &str) -> &str {
    match asset.split_once('_') {
        Some((family, _)) => family,
        None => asset,
    }
}

/// Time-weight factor in days between this batch and its predecessor, or the
/// configured default interval for the very first batch.
pub async fn time_weight(
    conn: &mut SqliteConnection,
    batch_id: i64,
    batch_ts: i64,
    default_interval_secs: i64,
) -> Result<f64, LedgerError> {
    let ts_kf = match batches::prev_batch_ts(&mut *conn, batch_id).await? {
        Some(prev_ts) => (batch_ts - prev_ts) as f64 / SECONDS_PER_DAY,
        None => default_interval_secs as f64 / SECONDS_PER_DAY,
    };
    Ok(ts_kf)
}

/// Recomputes the batch's points rows from its balance and price snapshots.
///
/// Existing rows for the batch are deleted first, so the step never
/// accumulates duplicates. Blacklisted addresses are excluded before
/// aggregation.
pub async fn compute_points(
    conn: &mut SqliteConnection,
    batch_id: i64,
    ts_kf: f64,
) -> Result<usize, LedgerError> {
    let prices: HashMap<String, f64> =
        batches::prices_for_batch(&mut *conn, batch_id).await?.into_iter().collect();
    let rows = balances::balances_for_points(&mut *conn, batch_id).await?;

    let mut totals: BTreeMap<(String, String), f64> = BTreeMap::new();
    for (address, asset, balance) in rows {
        let family = asset_family(&asset);
        let Some(price) = prices.get(family) else {
            tracing::warn!("no price snapshot for asset {family} in batch {batch_id}, skipping");
            continue;
        };
        let balance: f64 =
            balance.parse().map_err(|_| LedgerError::BadAmount(balance.clone()))?;
        *totals.entry((address, family.to_string())).or_insert(0.0) +=
            price * balance * ts_kf;
    }

    points_db::delete_points(&mut *conn, batch_id).await?;
    let count = totals.len();
    for ((address, family), points) in totals {
        points_db::insert_points(&mut *conn, batch_id, &address, &family, points.floor() as i64)
            .await?;
    }
    Ok(count)
}

pub struct FinishParams {
    pub default_interval_secs: i64,
    /// When set, the computed batch (and any other unpublished batch) is
    /// folded into the public ledger in the same transaction.
    pub publish: Option<PublishParams>,
}

#[derive(Debug)]
pub enum FinishOutcome {
    /// No batch had a ready task to finish.
    NothingToDo,
    Finished {
        batch_id: i64,
        points_rows: usize,
        published: Option<PublishStats>,
    },
}

/// Computes and commits points for a batch once every task reached `ready`.
///
/// The whole transition — points recompute, task status advance and the
/// optional publish — commits atomically; a precondition failure leaves the
/// store untouched.
pub async fn finish(
    db: &Db,
    batch_id: Option<i64>,
    params: &FinishParams,
) -> Result<FinishOutcome, LedgerError> {
    let Some(batch_id) = batches::batch_with_ready_task(db.pool(), batch_id).await? else {
        return Ok(FinishOutcome::NothingToDo);
    };
    tracing::info!("finishing batch {batch_id}");

    let mut tx = db.begin().await?;

    let not_ready = batches::count_not_ready(&mut *tx, batch_id).await?;
    if not_ready != 0 {
        return Err(LedgerError::TasksNotReady { batch_id });
    }

    let batch_ts = batches::batch_ts(&mut *tx, batch_id).await?;
    let ts_kf = time_weight(&mut *tx, batch_id, batch_ts, params.default_interval_secs).await?;
    tracing::debug!("ts_kf = {ts_kf}");

    let points_rows = compute_points(&mut *tx, batch_id, ts_kf).await?;
    batches::set_batch_tasks_status(&mut *tx, batch_id, TaskStatus::Processed).await?;

    let published = match &params.publish {
        Some(publish_params) => publish::fold_into_public(&mut *tx, publish_params).await?,
        None => None,
    };

    tx.commit().await.map_err(DbError::from)?;
    tracing::info!("batch {batch_id} has been finished");

    Ok(FinishOutcome::Finished { batch_id, points_rows, published })
}

/// Recomputes the points rows of an already-ingested batch and advances the
/// protocol's task to `processed`. Used after `recalculate_user_data`.
pub async fn recalculate_points(
    db: &Db,
    batch_id: i64,
    protocol_id: &str,
    default_interval_secs: i64,
) -> Result<usize, LedgerError> {
    let mut tx = db.begin().await?;

    let batch_ts = batches::batch_ts(&mut *tx, batch_id).await?;
    let ts_kf = time_weight(&mut *tx, batch_id, batch_ts, default_interval_secs).await?;
    tracing::debug!("ts_kf for batch {batch_id} = {ts_kf}");

    let rows = compute_points(&mut *tx, batch_id, ts_kf).await?;
    batches::set_task_status(&mut *tx, protocol_id, batch_id, TaskStatus::Processed).await?;

    tx.commit().await.map_err(DbError::from)?;
    tracing::info!("recalculated {rows} point rows for batch {batch_id}");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_strips_first_suffix_only() {
        assert_eq!(asset_family("dATOM"), "dATOM");
        assert_eq!(asset_family("dATOM_NTRN"), "dATOM");
        assert_eq!(asset_family("dATOM_USDC"), "dATOM");
        assert_eq!(asset_family("dATOM_LP_USDC"), "dATOM");
    }

    #[test]
    fn one_day_gap_is_unit_weight() {
        // batch 5 at 1,000,000 and batch 4 at 913,600 is exactly one day
        let ts_kf = (1_000_000i64 - 913_600) as f64 / SECONDS_PER_DAY;
        assert_eq!(ts_kf, 1.0);
    }
}
