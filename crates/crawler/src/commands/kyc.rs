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
use points_ledger::{
    db::accounts::{self, KycRecord},
    ingest::normalize_address,
    Db,
};

use crate::config::Config;

/// Manage KYC records. A referrer only earns bonuses once a KYC record
/// exists at or before the publish cutoff.
#[derive(Subcommand, Clone, Debug)]
pub enum KycCommands {
    /// Add or refresh a KYC record
    Add(KycAdd),
    /// Show an address's KYC record
    Get(KycGet),
}

impl KycCommands {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        match self {
            Self::Add(cmd) => cmd.run(db, config).await,
            Self::Get(cmd) => cmd.run(db, config).await,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct KycAdd {
    /// Address
    pub address: String,

    /// KYC provider
    #[clap(short, long, default_value = "local")]
    pub provider: String,

    /// KYC id (defaults to local_<address>)
    #[clap(short = 'i', long)]
    pub id: Option<String>,
}

impl KycAdd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let address = normalize_address(&self.address, &config.address_prefix)?;
        let kyc_id = self.id.clone().unwrap_or_else(|| format!("local_{address}"));
        tracing::info!(
            "adding KYC for address {address}, kyc id: {kyc_id}, kyc provider: {}",
            self.provider
        );

        accounts::upsert_kyc(
            db.pool(),
            &KycRecord {
                address,
                kyc_id,
                kyc_provider: self.provider.clone(),
                ts: chrono::Utc::now().timestamp(),
            },
        )
        .await?;
        Ok(())
    }
}

#[derive(Args, Clone, Debug)]
pub struct KycGet {
    /// Address
    pub address: String,
}

impl KycGet {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        let address = normalize_address(&self.address, &config.address_prefix)?;
        match accounts::get_kyc(db.pool(), &address).await? {
            Some(record) => println!(
                "kyc id: {}, provider: {}, ts: {}",
                record.kyc_id, record.kyc_provider, record.ts
            ),
            None => println!("no KYC found for address {address}"),
        }
        Ok(())
    }
}
