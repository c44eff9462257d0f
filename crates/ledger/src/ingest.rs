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

//! Balance ingestion: drives one protocol's Source adapter for one task and
//! persists the normalized records.
//!
//! Each streamed page is written in its own transaction; the task only moves
//! to `ready` after the adapter finished every page, so a crashed ingest
//! leaves the task `new` and the step is simply re-run.

use async_trait::async_trait;
use bech32::{Bech32, Hrp};

use crate::{
    db::{
        balances::{self, BalanceRow},
        batches::{self, TaskStatus},
        schedule, Db,
    },
    source::{BalanceSink, Source, UserBalance},
    LedgerError,
};

/// Balances are scaled from base units with fixed 6-decimal precision.
const BALANCE_DECIMALS: u32 = 6;

#[derive(Debug)]
pub struct IngestOutcome {
    pub batch_id: i64,
    pub height: i64,
    pub records: u64,
}

/// Re-encodes a bech32 address under the canonical prefix, so the same
/// underlying key counted on several chains aggregates into one ledger row.
pub fn normalize_address(address: &str, prefix: &str) -> Result<String, LedgerError> {
    let (_, data) =
        bech32::decode(address).map_err(|_| LedgerError::BadAddress(address.to_string()))?;
    let hrp = Hrp::parse(prefix).map_err(|_| LedgerError::BadAddress(prefix.to_string()))?;
    bech32::encode::<Bech32>(hrp, &data).map_err(|_| LedgerError::BadAddress(address.to_string()))
}

/// Scales a raw base-unit amount to a human-readable 6-decimal string.
pub fn scale_base_units(raw: &str) -> Result<String, LedgerError> {
    let units: u128 = raw.parse().map_err(|_| LedgerError::BadAmount(raw.to_string()))?;
    let scale = 10u128.pow(BALANCE_DECIMALS);
    Ok(format!("{}.{:06}", units / scale, units % scale))
}

/// Sink that lands every page in one transaction.
struct DbSink<'a> {
    db: &'a Db,
    batch_id: i64,
    protocol_id: &'a str,
    height: i64,
    address_prefix: &'a str,
    records: u64,
}

#[async_trait]
impl BalanceSink for DbSink<'_> {
    async fn on_page(&mut self, balances: Vec<UserBalance>) -> anyhow::Result<()> {
        let count = balances.len() as u64;
        let mut tx = self.db.begin().await?;
        for balance in balances {
            let row = BalanceRow {
                batch_id: self.batch_id,
                address: normalize_address(&balance.address, self.address_prefix)?,
                protocol_id: self.protocol_id.to_string(),
                height: self.height,
                asset: balance.asset,
                balance: scale_base_units(&balance.balance)?,
            };
            balances::insert_balance(&mut *tx, &row).await?;
        }
        tx.commit().await?;
        self.records += count;
        tracing::info!("inserted {count} user balances");
        Ok(())
    }
}

/// Executes one task for `protocol_id`: the task pinned to `batch_id`, or
/// the protocol's earliest pending task when unspecified.
pub async fn ingest_task(
    db: &Db,
    protocol_id: &str,
    batch_id: Option<i64>,
    source: &dyn Source,
    address_prefix: &str,
) -> Result<IngestOutcome, LedgerError> {
    let task = batches::find_new_task(db.pool(), protocol_id, batch_id)
        .await?
        .ok_or_else(|| LedgerError::NoPendingTask { protocol_id: protocol_id.to_string() })?;

    let multipliers =
        schedule::multipliers_for_protocol(db.pool(), protocol_id, task.ts).await?;
    tracing::info!(
        "processing task for protocol {protocol_id}, height {} and batch_id {} multipliers {multipliers:?}",
        task.height,
        task.batch_id,
    );

    let records =
        stream_balances(db, protocol_id, task.batch_id, task.height, source, &multipliers, address_prefix)
            .await?;

    batches::set_task_status(db.pool(), protocol_id, task.batch_id, TaskStatus::Ready).await?;
    tracing::info!("task has been processed");

    Ok(IngestOutcome { batch_id: task.batch_id, height: task.height, records })
}

/// Deletes the (batch, protocol) snapshot and ingests it again at the task's
/// recorded height. Idempotent under adapter retries.
pub async fn recalculate_user_data(
    db: &Db,
    protocol_id: &str,
    batch_id: i64,
    source: &dyn Source,
    address_prefix: &str,
) -> Result<IngestOutcome, LedgerError> {
    let height = batches::task_height(db.pool(), protocol_id, batch_id)
        .await?
        .ok_or_else(|| LedgerError::NoPendingTask { protocol_id: protocol_id.to_string() })?;
    let ts = batches::batch_ts(db.pool(), batch_id).await?;

    let removed = balances::delete_balances(db.pool(), batch_id, protocol_id).await?;
    tracing::info!("removed {removed} old balance records for batch {batch_id}");

    let multipliers = schedule::multipliers_for_protocol(db.pool(), protocol_id, ts).await?;
    let records =
        stream_balances(db, protocol_id, batch_id, height, source, &multipliers, address_prefix)
            .await?;

    Ok(IngestOutcome { batch_id, height, records })
}

async fn stream_balances(
    db: &Db,
    protocol_id: &str,
    batch_id: i64,
    height: i64,
    source: &dyn Source,
    multipliers: &std::collections::HashMap<String, f64>,
    address_prefix: &str,
) -> Result<u64, LedgerError> {
    let mut sink =
        DbSink { db, batch_id, protocol_id, height, address_prefix, records: 0 };
    source.get_users_balances(height as u64, multipliers, &mut sink).await?;
    Ok(sink.records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_base_units_to_six_decimals() {
        assert_eq!(scale_base_units("0").unwrap(), "0.000000");
        assert_eq!(scale_base_units("1").unwrap(), "0.000001");
        assert_eq!(scale_base_units("1500000").unwrap(), "1.500000");
        assert_eq!(scale_base_units("123456789").unwrap(), "123.456789");
    }

    #[test]
    fn rejects_non_integer_amounts() {
        assert!(scale_base_units("12.5").is_err());
        assert!(scale_base_units("").is_err());
        assert!(scale_base_units("-3").is_err());
    }

    #[test]
    fn normalizes_foreign_prefix() {
        // same key re-encoded under another hrp round-trips to itself
        let cosmos = bech32::encode::<Bech32>(Hrp::parse("cosmos").unwrap(), &[7u8; 20]).unwrap();
        let neutron = normalize_address(&cosmos, "neutron").unwrap();
        assert!(neutron.starts_with("neutron1"));
        assert_eq!(normalize_address(&neutron, "neutron").unwrap(), neutron);
    }

    #[test]
    fn rejects_garbage_addresses() {
        assert!(normalize_address("not-bech32", "neutron").is_err());
    }
}
