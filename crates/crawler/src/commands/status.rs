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

use anyhow::{bail, Result};
use clap::Args;
use points_ledger::{db::batches, Db};

/// Inspect batches and their task status.
#[derive(Args, Clone, Debug)]
pub struct StatusCmd {
    /// Show one batch's tasks instead of the batch list
    #[clap(short, long)]
    pub batch_id: Option<i64>,
}

impl StatusCmd {
    pub async fn run(&self, db: &Db) -> Result<()> {
        match self.batch_id {
            Some(batch_id) => {
                let Some(batch) = batches::get_batch(db.pool(), batch_id).await? else {
                    bail!("batch {batch_id} not found");
                };
                println!("batch {}: ts {} status {:?}", batch.batch_id, batch.ts, batch.status);
                for task in batches::tasks_for_batch(db.pool(), batch_id).await? {
                    println!(
                        "  {}\theight {} (jitter {})\t{:?}",
                        task.protocol_id, task.height, task.jitter, task.status
                    );
                }
            }
            None => {
                for batch in batches::list_batches(db.pool()).await? {
                    let not_ready = batches::count_not_ready(db.pool(), batch.batch_id).await?;
                    println!(
                        "batch {}: ts {} status {:?}, {} tasks pending",
                        batch.batch_id, batch.ts, batch.status, not_ready
                    );
                }
            }
        }
        Ok(())
    }
}
