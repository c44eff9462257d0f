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

//! Folds unpublished batches into the cumulative public ledger, propagates
//! two-level referral bonuses and recomputes the leaderboard rank.
//!
//! The caller supplies the transaction; the fold, bonuses and rank either all
//! land or none do.

use std::collections::{BTreeMap, HashMap};

use sqlx::SqliteConnection;

use crate::{
    db::{accounts, batches, batches::BatchStatus, points as points_db, schedule},
    points::asset_family,
    LedgerError,
};

#[derive(Debug, Clone)]
pub struct PublishParams {
    pub l1_percent: f64,
    pub l2_percent: f64,
}

#[derive(Debug)]
pub struct PublishStats {
    pub batch_ids: Vec<i64>,
    pub folded_rows: usize,
    pub referrers_credited: usize,
}

/// Folds every batch still in `new` status into the public ledger.
///
/// Referral bonuses only consider edges created at or before the earliest
/// folded batch's timestamp, and only referrers holding a KYC record as of
/// that time. The referred user is deliberately not KYC-filtered.
pub async fn fold_into_public(
    conn: &mut SqliteConnection,
    params: &PublishParams,
) -> Result<Option<PublishStats>, LedgerError> {
    let pending = batches::batches_with_status(&mut *conn, BatchStatus::New).await?;
    if pending.is_empty() {
        tracing::info!("no unpublished batches");
        return Ok(None);
    }
    let batch_ids: Vec<i64> = pending.iter().map(|b| b.batch_id).collect();
    let cutoff = pending[0].ts;
    tracing::debug!("publishing batches {batch_ids:?}, referral cutoff {cutoff}");

    points_db::zero_change(&mut *conn).await?;

    let folds = points_db::sum_points(&mut *conn, &batch_ids).await?;
    let folded_rows = folds.len();
    for (address, asset_id, delta) in &folds {
        points_db::upsert_fold(&mut *conn, address, asset_id, *delta).await?;
    }

    // Referrers without any points of their own still need ledger rows for
    // the bonus credit below; seed one zero row per known asset family.
    let mut families: Vec<String> = schedule::all_asset_ids(&mut *conn)
        .await?
        .iter()
        .map(|asset| asset_family(asset).to_string())
        .collect();
    families.sort();
    families.dedup();
    for referrer in accounts::all_referrers(&mut *conn).await? {
        for family in &families {
            points_db::seed_row(&mut *conn, &referrer, family).await?;
        }
    }

    points_db::snapshot_prev_bonus(&mut *conn).await?;

    let edges = accounts::referral_edges(&mut *conn, cutoff).await?;
    let kyc = accounts::kyc_addresses(&mut *conn, cutoff).await?;
    let change: HashMap<String, i64> =
        points_db::change_by_address(&mut *conn).await?.into_iter().collect();

    let mut direct: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for edge in &edges {
        direct.entry(edge.referrer.as_str()).or_default().push(edge.referral.as_str());
    }

    let mut referrers_credited = 0;
    for (referrer, referrals) in &direct {
        if !kyc.contains(*referrer) {
            continue;
        }

        let l1_base: i64 =
            referrals.iter().map(|r| change.get(*r).copied().unwrap_or(0)).sum();
        let l2_base: i64 = referrals
            .iter()
            .flat_map(|r| direct.get(*r).into_iter().flatten())
            .map(|r2| change.get(*r2).copied().unwrap_or(0))
            .sum();

        let l1_delta = (l1_base as f64 * params.l1_percent / 100.0).floor() as i64;
        let l2_delta = (l2_base as f64 * params.l2_percent / 100.0).floor() as i64;
        if l1_delta == 0 && l2_delta == 0 {
            continue;
        }

        points_db::add_bonus(&mut *conn, referrer, l1_delta, l2_delta).await?;
        referrers_credited += 1;
    }

    points_db::apply_bonus_to_change(&mut *conn).await?;

    // Rank over per-address grand totals; ties break on address for a
    // deterministic ordering.
    let totals = points_db::totals_by_address(&mut *conn).await?;
    for (place, (address, _)) in totals.iter().enumerate() {
        points_db::set_place(&mut *conn, address, place as i64 + 1).await?;
    }

    batches::mark_batches_processed(&mut *conn, &batch_ids).await?;

    Ok(Some(PublishStats { batch_ids, folded_rows, referrers_credited }))
}
