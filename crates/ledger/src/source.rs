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

//! The capability contract every protocol balance adapter implements.
//!
//! Adapters stream raw base-unit balances in pages; the ingestion engine owns
//! normalization and persistence, so a failed page aborts the task before it
//! is ever marked ready.

use std::collections::HashMap;

use async_trait::async_trait;

/// One raw balance record as reported by a protocol adapter. `balance` is a
/// base-unit integer rendered as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UserBalance {
    pub address: String,
    pub balance: String,
    pub asset: String,
}

/// Receives pages of balance records during one adapter invocation.
#[async_trait]
pub trait BalanceSink: Send {
    async fn on_page(&mut self, balances: Vec<UserBalance>) -> anyhow::Result<()>;
}

/// Uniform capability interface over one protocol's chain.
#[async_trait]
pub trait Source: Send + Sync {
    /// Current height of the protocol's chain.
    async fn get_last_block_height(&self) -> anyhow::Result<u64>;

    /// Streams every holder's balances at `height` for the assets named in
    /// `multipliers`, invoking the sink zero or more times.
    async fn get_users_balances(
        &self,
        height: u64,
        multipliers: &HashMap<String, f64>,
        sink: &mut dyn BalanceSink,
    ) -> anyhow::Result<()>;
}

pub type SourceObj = Box<dyn Source>;

/// A sink that buffers every page, for adapters' own tests.
#[derive(Default)]
pub struct VecSink {
    pub pages: Vec<Vec<UserBalance>>,
}

#[async_trait]
impl BalanceSink for VecSink {
    async fn on_page(&mut self, balances: Vec<UserBalance>) -> anyhow::Result<()> {
        self.pages.push(balances);
        Ok(())
    }
}
