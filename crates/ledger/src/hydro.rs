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

//! Proportional reward pot allocator and its idempotent ledger merge.
//!
//! The allocator uses the largest-remainder method: floor every exact share,
//! then hand the leftover out one unit at a time to the largest fractional
//! remainders. The full pot is always distributed, with no rounding loss.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::{
    db::{hydro as hydro_db, points as points_db, Db, DbError},
    LedgerError,
};

/// Asset id under which pot rewards land in the public ledger.
pub const HYDRO_ASSET_ID: &str = "hydro";

/// One weighted participant, restricted to the chosen selection key upstream.
#[derive(Debug, Clone)]
pub struct WeightedEntry {
    pub address: String,
    pub weight: u64,
}

/// One allocated share. `fraction` is retained in the review artifact so an
/// operator can audit how the leftover was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydroShare {
    pub address: String,
    pub reward: i64,
    pub fraction: f64,
}

/// Splits `pot` across the entries proportionally to weight.
///
/// The returned shares are ordered by descending fraction (stable for ties),
/// matching the leftover assignment order.
pub fn allocate(pot: i64, entries: &[WeightedEntry]) -> Result<Vec<HydroShare>, LedgerError> {
    let total_weight: u128 = entries.iter().map(|e| e.weight as u128).sum();
    if pot <= 0 || total_weight == 0 {
        return Err(LedgerError::EmptyAllocation);
    }

    let mut allocated = 0i64;
    let mut shares: Vec<HydroShare> = entries
        .iter()
        .map(|entry| {
            let exact = pot as f64 * (entry.weight as f64 / total_weight as f64);
            let reward = exact.floor() as i64;
            allocated += reward;
            HydroShare { address: entry.address.clone(), reward, fraction: exact - reward as f64 }
        })
        .collect();

    let leftover = pot - allocated;
    if leftover > 0 {
        tracing::info!("found {leftover} leftover rewards");
        shares.sort_by(|a, b| b.fraction.total_cmp(&a.fraction));
        let num_shares = shares.len();
        for i in 0..leftover as usize {
            shares[i % num_shares].reward += 1;
        }
        tracing::info!("leftover rewards were distributed");
    }

    Ok(shares)
}

#[derive(Debug)]
pub struct MergeStats {
    pub group_id: i64,
    pub imported: usize,
    pub merged: usize,
}

/// Imports the reviewed shares as a fresh allocation group and merges it
/// into the public ledger, all in one transaction.
pub async fn import_and_merge(db: &Db, shares: &[HydroShare]) -> Result<MergeStats, LedgerError> {
    let mut tx = db.begin().await?;

    let group_id = hydro_db::next_group_id(&mut *tx).await?;
    let mut imported = 0;
    for share in shares {
        if share.reward <= 0 {
            continue;
        }
        hydro_db::insert_allocation(&mut *tx, group_id, &share.address, share.reward).await?;
        imported += 1;
    }
    tracing::info!("inserted {imported} entries into hydro allocations group {group_id}");

    let merged = merge_unprocessed(&mut *tx, group_id).await?;

    tx.commit().await.map_err(DbError::from)?;
    Ok(MergeStats { group_id, imported, merged })
}

/// Re-runs the merge for an existing group. Allocations already consumed are
/// skipped via their `processed` flag, so the call is safely re-invocable.
pub async fn merge_group(db: &Db, group_id: i64) -> Result<MergeStats, LedgerError> {
    let mut tx = db.begin().await?;
    let merged = merge_unprocessed(&mut *tx, group_id).await?;
    tx.commit().await.map_err(DbError::from)?;
    Ok(MergeStats { group_id, imported: 0, merged })
}

async fn merge_unprocessed(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> Result<usize, LedgerError> {
    let allocations = hydro_db::unprocessed_allocations(&mut *conn, group_id).await?;

    let mut merged = 0;
    for allocation in allocations {
        // Silently skipping a malformed allocation would misallocate funds.
        if allocation.address.is_empty() {
            return Err(LedgerError::MalformedAllocation {
                id: allocation.id,
                field: "address",
            });
        }
        if allocation.reward <= 0 {
            return Err(LedgerError::MalformedAllocation { id: allocation.id, field: "reward" });
        }

        let rows =
            points_db::rows_for_address_asset(&mut *conn, &allocation.address, HYDRO_ASSET_ID)
                .await?;
        if rows.len() > 1 {
            return Err(LedgerError::DuplicateLedgerRow {
                address: allocation.address.clone(),
                asset_id: HYDRO_ASSET_ID.to_string(),
            });
        }

        if rows.is_empty() {
            points_db::insert_public_row(
                &mut *conn,
                &allocation.address,
                HYDRO_ASSET_ID,
                allocation.reward,
            )
            .await?;
        } else {
            points_db::add_points_and_change(
                &mut *conn,
                &allocation.address,
                HYDRO_ASSET_ID,
                allocation.reward,
            )
            .await?;
        }

        hydro_db::mark_allocation_processed(&mut *conn, allocation.id).await?;
        merged += 1;
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(weights: &[u64]) -> Vec<WeightedEntry> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightedEntry { address: format!("addr{i}"), weight: *w })
            .collect()
    }

    #[test]
    fn exact_shares_leave_no_leftover() {
        let shares = allocate(100, &entries(&[50, 30, 20])).unwrap();
        let rewards: Vec<i64> = shares.iter().map(|s| s.reward).collect();
        assert_eq!(rewards, vec![50, 30, 20]);
    }

    #[test]
    fn leftover_goes_to_largest_fraction_first() {
        let shares = allocate(10, &entries(&[1, 1, 1])).unwrap();
        // all fractions equal, so the stable sort keeps entry order and the
        // single leftover unit lands on the first entry
        let rewards: Vec<i64> = shares.iter().map(|s| s.reward).collect();
        assert_eq!(rewards, vec![4, 3, 3]);
        assert_eq!(rewards.iter().sum::<i64>(), 10);
    }

    #[test]
    fn leftover_spreads_across_entries() {
        // pot 9 across 5 equal voters: floors 1 each, four leftover units
        let shares = allocate(9, &entries(&[1, 1, 1, 1, 1])).unwrap();
        let rewards: Vec<i64> = shares.iter().map(|s| s.reward).collect();
        assert_eq!(rewards, vec![2, 2, 2, 2, 1]);
    }

    #[test]
    fn rejects_empty_or_zero_weight_sets() {
        assert!(allocate(100, &[]).is_err());
        assert!(allocate(100, &entries(&[0, 0])).is_err());
        assert!(allocate(0, &entries(&[1])).is_err());
    }

    proptest::proptest! {
        // conservation law: every unit of the pot is distributed, always
        #[test]
        fn pot_is_conserved(
            pot in 1i64..1_000_000,
            weights in proptest::collection::vec(1u64..1_000_000, 1..50),
        ) {
            let shares = allocate(pot, &entries(&weights)).unwrap();
            proptest::prop_assert_eq!(shares.iter().map(|s| s.reward).sum::<i64>(), pot);
        }
    }
}
