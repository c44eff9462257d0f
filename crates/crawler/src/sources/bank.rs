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

//! Bank-module source: pages through a denom's holders via the LCD
//! `denom_owners` endpoint at the task's height.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use points_ledger::{BalanceSink, Source, UserBalance};

use super::{scale_by_multiplier, scheduled_assets};
use crate::{config::ProtocolConfig, lcd::LcdClient};

pub struct BankSource {
    protocol_id: String,
    lcd: LcdClient,
    /// asset id -> chain denom
    assets: HashMap<String, String>,
    pagination_limit: u32,
}

impl BankSource {
    pub fn new(protocol_id: &str, config: &ProtocolConfig) -> Result<Self> {
        Ok(Self {
            protocol_id: protocol_id.to_string(),
            lcd: LcdClient::new(&config.rest)?,
            assets: config
                .assets
                .iter()
                .map(|(asset_id, asset)| (asset_id.clone(), asset.denom.clone()))
                .collect(),
            pagination_limit: config.pagination_limit,
        })
    }
}

#[async_trait]
impl Source for BankSource {
    async fn get_last_block_height(&self) -> Result<u64> {
        self.lcd.latest_height().await
    }

    async fn get_users_balances(
        &self,
        height: u64,
        multipliers: &HashMap<String, f64>,
        sink: &mut dyn BalanceSink,
    ) -> Result<()> {
        let assets = scheduled_assets(&self.protocol_id, self.assets.keys(), multipliers)?;

        for asset_id in assets {
            let denom = &self.assets[&asset_id];
            let multiplier = multipliers[&asset_id];
            let mut next_key: Option<String> = None;

            loop {
                let page = self
                    .lcd
                    .denom_owners(denom, height, self.pagination_limit, next_key.as_deref())
                    .await?;
                if page.denom_owners.is_empty() {
                    break;
                }
                tracing::debug!(
                    "fetched {} holders of {denom} for {}",
                    page.denom_owners.len(),
                    self.protocol_id,
                );

                let records = page
                    .denom_owners
                    .iter()
                    .map(|owner| {
                        Ok(UserBalance {
                            address: owner.address.clone(),
                            balance: scale_by_multiplier(&owner.balance.amount, multiplier)?,
                            asset: asset_id.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                sink.on_page(records).await?;

                next_key = page.pagination.and_then(|p| p.next_key);
                if next_key.is_none() {
                    break;
                }
            }
        }

        tracing::debug!("finished fetching all balances for {}", self.protocol_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use points_ledger::source::VecSink;

    fn config(rest: &str) -> ProtocolConfig {
        let raw = format!(
            r#"
            source = "bank"
            rest = "{rest}"
            pagination_limit = 2

            [assets.dATOM]
            denom = "udatom"
            "#
        );
        toml::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn pages_through_denom_owners() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/cosmos/bank/v1beta1/denom_owners/udatom")
                .query_param_exists("pagination.limit")
                .matches(|req| {
                    !req.query_params
                        .as_ref()
                        .is_some_and(|params| params.iter().any(|(k, _)| k == "pagination.key"))
                });
            then.status(200).json_body(serde_json::json!({
                "denom_owners": [
                    {"address": "neutron1aaa", "balance": {"denom": "udatom", "amount": "100"}},
                    {"address": "neutron1bbb", "balance": {"denom": "udatom", "amount": "200"}}
                ],
                "pagination": {"next_key": "page2"}
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/cosmos/bank/v1beta1/denom_owners/udatom")
                .query_param("pagination.key", "page2");
            then.status(200).json_body(serde_json::json!({
                "denom_owners": [
                    {"address": "neutron1ccc", "balance": {"denom": "udatom", "amount": "300"}}
                ],
                "pagination": {"next_key": null}
            }));
        });

        let source = BankSource::new("neutron", &config(&server.base_url())).unwrap();
        let multipliers = HashMap::from([("dATOM".to_string(), 2.0)]);
        let mut sink = VecSink::default();
        source.get_users_balances(500, &multipliers, &mut sink).await.unwrap();

        assert_eq!(sink.pages.len(), 2);
        assert_eq!(sink.pages[0].len(), 2);
        assert_eq!(sink.pages[0][0].address, "neutron1aaa");
        // the multiplier is applied in base units
        assert_eq!(sink.pages[0][0].balance, "200");
        assert_eq!(sink.pages[1][0].balance, "600");
    }

    #[tokio::test]
    async fn scheduled_but_unconfigured_asset_is_fatal() {
        let server = MockServer::start();
        let source = BankSource::new("neutron", &config(&server.base_url())).unwrap();
        let multipliers = HashMap::from([("dTIA".to_string(), 1.0)]);
        let mut sink = VecSink::default();
        assert!(source.get_users_balances(500, &multipliers, &mut sink).await.is_err());
    }
}
