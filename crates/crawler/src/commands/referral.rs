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
use clap::{Args, Subcommand};
use points_ledger::{db::accounts, Db};

/// Manage the append-only referral graph.
#[derive(Subcommand, Clone, Debug)]
pub enum ReferralCommands {
    /// Add a referral edge
    Add(ReferralAdd),
    /// List an address's referrals
    List(ReferralList),
}

impl ReferralCommands {
    pub async fn run(&self, db: &Db) -> Result<()> {
        match self {
            Self::Add(cmd) => cmd.run(db).await,
            Self::List(cmd) => cmd.run(db).await,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct ReferralAdd {
    /// Referrer address
    pub referrer: String,

    /// Address of the referral
    pub referral: String,

    /// Edge timestamp; edges dated after a publish cutoff earn nothing for
    /// batches that precede them
    #[clap(short, long, default_value_t = 0)]
    pub ts: i64,
}

impl ReferralAdd {
    pub async fn run(&self, db: &Db) -> Result<()> {
        tracing::info!("adding referral {} -> {}", self.referrer, self.referral);
        accounts::add_referral(db.pool(), &self.referrer, &self.referral, self.ts).await?;
        Ok(())
    }
}

#[derive(Args, Clone, Debug)]
pub struct ReferralList {
    /// Referrer address
    pub address: String,
}

impl ReferralList {
    pub async fn run(&self, db: &Db) -> Result<()> {
        for edge in accounts::referrals_of(db.pool(), &self.address).await? {
            println!("referrer: {}\treferral: {}\tts: {}", edge.referrer, edge.referral, edge.ts);
        }
        Ok(())
    }
}
