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

use std::net::SocketAddr;

use anyhow::Result;
use clap::Args;
use points_ledger::Db;

use crate::api;

/// Serve the read-only leaderboard API.
#[derive(Args, Clone, Debug)]
pub struct ServeCmd {
    /// Address to listen on
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,
}

impl ServeCmd {
    pub async fn run(&self, db: &Db) -> Result<()> {
        api::serve(db.clone(), self.listen).await
    }
}
