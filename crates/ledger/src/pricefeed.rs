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

use async_trait::async_trait;

/// Price oracle consumed during batch preparation. Prices are snapshotted at
/// a jittered oracle height and immutable afterwards.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn get_last_height(&self) -> anyhow::Result<u64>;

    async fn get_price(&self, asset_id: &str, height: u64) -> anyhow::Result<f64>;
}
