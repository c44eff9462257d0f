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
use points_ledger::{
    points::{self, FinishOutcome, FinishParams},
    publish::PublishParams,
    Db,
};

use crate::config::Config;

/// Compute points for a batch once all of its tasks are ready.
#[derive(Args, Clone, Debug)]
pub struct FinishCmd {
    /// Batch to finish (defaults to the earliest batch with a ready task)
    #[clap(short, long)]
    pub batch_id: Option<i64>,

    /// Also fold the result into the public ledger
    #[clap(short, long)]
    pub publish: bool,
}

impl FinishCmd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let params = FinishParams {
            default_interval_secs: config.default_interval,
            publish: self.publish.then(|| PublishParams {
                l1_percent: config.l1_percent,
                l2_percent: config.l2_percent,
            }),
        };

        match points::finish(db, self.batch_id, &params).await {
            Ok(FinishOutcome::NothingToDo) => {
                println!("no tasks for finishing found");
                Ok(())
            }
            Ok(FinishOutcome::Finished { batch_id, points_rows, published }) => {
                println!("batch {batch_id}: {points_rows} point rows computed");
                if let Some(stats) = published {
                    println!(
                        "published batches {:?}: {} ledger rows folded, {} referrers credited",
                        stats.batch_ids, stats.folded_rows, stats.referrers_credited
                    );
                }
                Ok(())
            }
            Err(err) if err.is_precondition() => {
                tracing::error!("{err}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
