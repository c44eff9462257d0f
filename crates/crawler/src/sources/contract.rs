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

//! CW20-style holder contract source: pages through `all_accounts`, then
//! fans out one balance query per account with a bounded concurrency limit.
//! Archive nodes rate-limit aggressively, so the limit is deliberately low.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use points_ledger::{BalanceSink, Source, UserBalance};
use serde::Deserialize;

use super::{scale_by_multiplier, scheduled_assets};
use crate::{config::ProtocolConfig, lcd::LcdClient};

pub struct ContractSource {
    protocol_id: String,
    lcd: LcdClient,
    contract: String,
    assets: Vec<String>,
    pagination_limit: u32,
    concurrency_limit: usize,
}

#[derive(Debug, Deserialize)]
struct AllAccountsResponse {
    accounts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: String,
}

impl ContractSource {
    pub fn new(protocol_id: &str, config: &ProtocolConfig) -> Result<Self> {
        Ok(Self {
            protocol_id: protocol_id.to_string(),
            lcd: LcdClient::new(&config.rest)?,
            contract: config
                .contract
                .clone()
                .with_context(|| format!("protocol {protocol_id}: no contract configured"))?,
            assets: config.assets.keys().cloned().collect(),
            pagination_limit: config.pagination_limit,
            concurrency_limit: config.concurrency_limit.max(1),
        })
    }

    async fn account_page(&self, height: u64, start_after: Option<&str>) -> Result<Vec<String>> {
        let msg = match start_after {
            Some(start_after) => serde_json::json!({
                "all_accounts": {"limit": self.pagination_limit, "start_after": start_after}
            }),
            None => serde_json::json!({"all_accounts": {"limit": self.pagination_limit}}),
        };
        let response: AllAccountsResponse =
            self.lcd.smart_query(&self.contract, height, &msg).await?;
        Ok(response.accounts)
    }

    async fn balances_of(&self, height: u64, accounts: &[String]) -> Result<Vec<(String, String)>> {
        let mut balances: Vec<(String, String)> = stream::iter(accounts.iter().cloned())
            .map(|account| async move {
                let response: BalanceResponse = self
                    .lcd
                    .smart_query(
                        &self.contract,
                        height,
                        &serde_json::json!({"balance": {"address": account}}),
                    )
                    .await?;
                Ok::<_, anyhow::Error>((account, response.balance))
            })
            .buffer_unordered(self.concurrency_limit)
            .try_collect()
            .await?;
        // the fan-out completes out of order; keep pages deterministic
        balances.sort();
        Ok(balances)
    }
}

#[async_trait]
impl Source for ContractSource {
    async fn get_last_block_height(&self) -> Result<u64> {
        self.lcd.latest_height().await
    }

    async fn get_users_balances(
        &self,
        height: u64,
        multipliers: &HashMap<String, f64>,
        sink: &mut dyn BalanceSink,
    ) -> Result<()> {
        let assets = scheduled_assets(&self.protocol_id, self.assets.iter(), multipliers)?;

        let mut start_after: Option<String> = None;
        loop {
            let accounts = self.account_page(height, start_after.as_deref()).await?;
            if accounts.is_empty() {
                break;
            }
            tracing::debug!(
                "fetching balances for {} accounts of {}",
                accounts.len(),
                self.protocol_id,
            );

            let balances = self.balances_of(height, &accounts).await?;
            for asset_id in &assets {
                let multiplier = multipliers[asset_id];
                let records = balances
                    .iter()
                    .filter(|(_, balance)| balance != "0")
                    .map(|(address, balance)| {
                        Ok(UserBalance {
                            address: address.clone(),
                            balance: scale_by_multiplier(balance, multiplier)?,
                            asset: asset_id.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                if !records.is_empty() {
                    sink.on_page(records).await?;
                }
            }

            start_after = accounts.last().cloned();
        }

        tracing::debug!("finished fetching all balances for {}", self.protocol_id);
        Ok(())
    }
}
