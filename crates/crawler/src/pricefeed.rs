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

//! Oracle contract client implementing the ledger's [`PriceFeed`] contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use points_ledger::PriceFeed;
use serde::Deserialize;

use crate::{config::PricefeedConfig, lcd::LcdClient};

pub struct OraclePriceFeed {
    lcd: LcdClient,
    contract: String,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: String,
}

impl OraclePriceFeed {
    pub fn new(config: &PricefeedConfig) -> Result<Self> {
        Ok(Self { lcd: LcdClient::new(&config.rest)?, contract: config.contract.clone() })
    }
}

#[async_trait]
impl PriceFeed for OraclePriceFeed {
    async fn get_last_height(&self) -> Result<u64> {
        self.lcd.latest_height().await
    }

    async fn get_price(&self, asset_id: &str, height: u64) -> Result<f64> {
        tracing::debug!("getting price for asset {asset_id}");
        let response: PriceResponse = self
            .lcd
            .smart_query(
                &self.contract,
                height,
                &serde_json::json!({"price": {"denom": asset_id}}),
            )
            .await?;
        response.price.parse().with_context(|| format!("malformed price for {asset_id}"))
    }
}
