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
use points_ledger::{batch, Db};

use crate::{commands::build_plans, config::Config, pricefeed::OraclePriceFeed};

/// Open a batch and create one task per schedule-active protocol.
#[derive(Args, Clone, Debug)]
pub struct PrepareCmd {
    /// Timestamp to snapshot at (defaults to now)
    #[clap(short, long)]
    pub timestamp: Option<i64>,
}

impl PrepareCmd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let ts = self.timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp());
        let plans = build_plans(config)?;
        let pricefeed = OraclePriceFeed::new(&config.pricefeed)?;
        // one draw for the whole cycle; IBC-linked chains must shift together
        let time_shift: f64 = rand::random();

        match batch::prepare_batch(db, &plans, &pricefeed, config.pricefeed.jitter, ts, time_shift)
            .await
        {
            Ok(outcome) => {
                println!(
                    "batch {}: {} tasks created, {} prices snapshotted",
                    outcome.batch_id, outcome.tasks_created, outcome.prices_snapshotted
                );
                Ok(())
            }
            Err(err) if err.is_precondition() => {
                tracing::warn!("{err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
