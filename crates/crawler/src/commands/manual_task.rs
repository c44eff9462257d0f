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

/// Add tasks at an explicit height, reusing the batch for the timestamp if
/// one exists. Safe to re-run with identical inputs.
#[derive(Args, Clone, Debug)]
pub struct ManualTaskCmd {
    /// Timestamp to use
    #[clap(short, long)]
    pub timestamp: i64,

    /// Block height to use
    #[clap(long)]
    pub height: i64,

    /// Jitter to record on the tasks
    #[clap(short, long)]
    pub jitter: i64,
}

impl ManualTaskCmd {
    pub async fn run(&self, db: &Db) -> Result<()> {
        match batch::create_manual_tasks(db, self.timestamp, self.height, self.jitter).await {
            Ok(outcome) => {
                println!(
                    "batch {}: {} tasks added at height {}",
                    outcome.batch_id, outcome.tasks_created, self.height
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
