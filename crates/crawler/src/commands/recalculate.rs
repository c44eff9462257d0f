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
use points_ledger::{ingest, points, Db};

use crate::{config::Config, sources};

/// Re-ingest balances and recompute points for one protocol's batches.
/// Points rows are fully derivable, so the step can be repeated freely.
#[derive(Args, Clone, Debug)]
pub struct RecalculateCmd {
    /// Comma-separated batch ids to recalculate
    #[clap(short, long, value_delimiter = ',', required = true)]
    pub batch_ids: Vec<i64>,

    /// Protocol to recalculate balances for
    #[clap(short, long)]
    pub protocol_id: String,
}

impl RecalculateCmd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let protocol = config.protocol(&self.protocol_id)?;
        let source = sources::build(&self.protocol_id, protocol)?;

        tracing::info!("recalculating batches {:?}", self.batch_ids);
        for batch_id in &self.batch_ids {
            let outcome = ingest::recalculate_user_data(
                db,
                &self.protocol_id,
                *batch_id,
                source.as_ref(),
                &config.address_prefix,
            )
            .await?;
            tracing::info!(
                "batch {batch_id}: re-ingested {} records at height {}",
                outcome.records,
                outcome.height
            );

            let rows = points::recalculate_points(
                db,
                *batch_id,
                &self.protocol_id,
                config.default_interval,
            )
            .await?;
            println!("batch {batch_id}: {rows} point rows recomputed");
        }
        Ok(())
    }
}
