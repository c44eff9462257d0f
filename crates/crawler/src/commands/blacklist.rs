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

/// Edit the address blacklist. Blacklisted addresses accrue no points.
#[derive(Subcommand, Clone, Debug)]
pub enum BlacklistCommands {
    /// Insert an address into the blacklist
    Add(BlacklistAdd),
    /// Remove an address from the blacklist
    Remove(BlacklistRemove),
}

impl BlacklistCommands {
    pub async fn run(&self, db: &Db) -> Result<()> {
        match self {
            Self::Add(cmd) => {
                accounts::add_to_blacklist(db.pool(), &cmd.address).await?;
                println!("inserted {} into blacklist", cmd.address);
                Ok(())
            }
            Self::Remove(cmd) => {
                accounts::remove_from_blacklist(db.pool(), &cmd.address).await?;
                println!("removed {} from blacklist", cmd.address);
                Ok(())
            }
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct BlacklistAdd {
    pub address: String,
}

#[derive(Args, Clone, Debug)]
pub struct BlacklistRemove {
    pub address: String,
}
