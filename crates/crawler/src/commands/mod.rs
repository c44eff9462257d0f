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

//! Operator command surface. Every command is one idempotent step; retry
//! policy is re-running the same command.

mod blacklist;
mod crawl;
mod finish;
mod hydro;
mod kyc;
mod manual_task;
mod prepare;
mod publish;
mod recalculate;
mod referral;
mod schedule;
mod serve;
mod status;

pub use blacklist::BlacklistCommands;
pub use crawl::CrawlCmd;
pub use finish::FinishCmd;
pub use hydro::HydroCommands;
pub use kyc::KycCommands;
pub use manual_task::ManualTaskCmd;
pub use prepare::PrepareCmd;
pub use publish::PublishOnChainCmd;
pub use recalculate::RecalculateCmd;
pub use referral::ReferralCommands;
pub use schedule::ScheduleCommands;
pub use serve::ServeCmd;
pub use status::StatusCmd;

use anyhow::Result;
use clap::Subcommand;
use points_ledger::{batch::ProtocolPlan, points::asset_family, Db};

use crate::{config::Config, sources};

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Open a batch and create tasks for processing sources
    Prepare(PrepareCmd),
    /// Manually add tasks with an explicit block height and timestamp
    ManualTask(ManualTaskCmd),
    /// Ingest balances for one protocol's pending task
    Crawl(CrawlCmd),
    /// Compute points for a batch and optionally publish them
    Finish(FinishCmd),
    /// Re-ingest balances and recompute points for a protocol's batches
    Recalculate(RecalculateCmd),
    /// Push cumulative totals to the on-chain store
    PublishOnChain(PublishOnChainCmd),
    /// Inspect batches and their task status
    Status(StatusCmd),
    /// Manage multiplier schedule rules
    #[command(subcommand)]
    Schedule(ScheduleCommands),
    /// Manage referral edges
    #[command(subcommand)]
    Referral(ReferralCommands),
    /// Edit the address blacklist
    #[command(subcommand)]
    Blacklist(BlacklistCommands),
    /// Manage KYC records
    #[command(subcommand)]
    Kyc(KycCommands),
    /// Reward pot allocation: compute, review, then merge
    #[command(subcommand)]
    Hydro(HydroCommands),
    /// Serve the read-only leaderboard API
    Serve(ServeCmd),
}

impl Command {
    pub async fn run(self, db: &Db, config: &Config, db_url: &str) -> Result<()> {
        match self {
            Self::Prepare(cmd) => cmd.run(db, config).await,
            Self::ManualTask(cmd) => cmd.run(db).await,
            Self::Crawl(cmd) => cmd.run(db, config).await,
            Self::Finish(cmd) => cmd.run(db, config).await,
            Self::Recalculate(cmd) => cmd.run(db, config).await,
            Self::PublishOnChain(cmd) => cmd.run(db, config).await,
            Self::Status(cmd) => cmd.run(db).await,
            Self::Schedule(cmd) => cmd.run(db, config).await,
            Self::Referral(cmd) => cmd.run(db).await,
            Self::Blacklist(cmd) => cmd.run(db).await,
            Self::Kyc(cmd) => cmd.run(db, config).await,
            Self::Hydro(cmd) => cmd.run(db, db_url).await,
            Self::Serve(cmd) => cmd.run(db).await,
        }
    }
}

/// One [`ProtocolPlan`] per configured protocol. Prices are snapshotted per
/// asset family, so suffixed reporting ids collapse here.
pub(crate) fn build_plans(config: &Config) -> Result<Vec<ProtocolPlan>> {
    let mut plans = Vec::new();
    for (protocol_id, protocol) in &config.protocols {
        let mut families: Vec<String> =
            protocol.assets.keys().map(|asset| asset_family(asset).to_string()).collect();
        families.sort();
        families.dedup();
        plans.push(ProtocolPlan {
            protocol_id: protocol_id.clone(),
            jitter: protocol.jitter,
            assets: families,
            source: sources::build(protocol_id, protocol)?,
        });
    }
    plans.sort_by(|a, b| a.protocol_id.cmp(&b.protocol_id));
    Ok(plans)
}
