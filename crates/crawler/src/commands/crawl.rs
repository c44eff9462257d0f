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

use anyhow::Result;
use clap::Args;
use points_ledger::{ingest, Db};

use crate::{config::Config, sources};

/// Ingest balances for one protocol's pending task.
#[derive(Args, Clone, Debug)]
pub struct CrawlCmd {
    /// Protocol to crawl
    pub protocol_id: String,

    /// Batch to process (defaults to the protocol's earliest pending task)
    #[clap(short, long)]
    pub batch_id: Option<i64>,
}

impl CrawlCmd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let protocol = config.protocol(&self.protocol_id)?;
        let source = sources::build(&self.protocol_id, protocol)?;

        match ingest::ingest_task(
            db,
            &self.protocol_id,
            self.batch_id,
            source.as_ref(),
            &config.address_prefix,
        )
        .await
        {
            Ok(outcome) => {
                println!(
                    "batch {}: ingested {} balance records at height {}",
                    outcome.batch_id, outcome.records, outcome.height
                );
                Ok(())
            }
            Err(err) if err.is_precondition() => {
                tracing::info!("{err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
