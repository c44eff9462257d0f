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

use anyhow::{Context, Result};
use clap::Args;
use points_ledger::{publisher, Db, DEFAULT_PUBLISH_BATCH_SIZE};

use crate::{config::Config, publisher::HttpPublisher};

/// Push every address's cumulative total to the on-chain store.
#[derive(Args, Clone, Debug)]
pub struct PublishOnChainCmd {}

impl PublishOnChainCmd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let storage =
            config.on_chain_storage.as_ref().context("on_chain_storage is not configured")?;
        let publisher_client = HttpPublisher::new(storage)?;
        let batch_size = storage.batch_size.unwrap_or(DEFAULT_PUBLISH_BATCH_SIZE);

        let total = publisher::publish_on_chain(db, &publisher_client, batch_size).await?;
        println!("published {total} address totals to the on-chain store");
        Ok(())
    }
}
