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

//! On-chain publication of cumulative point totals, in bounded-size chunks.

use async_trait::async_trait;

use crate::{
    db::{points, Db},
    LedgerError,
};

pub const DEFAULT_PUBLISH_BATCH_SIZE: usize = 1000;

/// One (address, total points) pair as submitted to the contract.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AddressPoints {
    pub address: String,
    pub points: i64,
}

/// Submits chunks of totals to the on-chain store. Invoked at-least-once;
/// the contract applies set semantics, so resubmission is safe.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn submit(&self, points: &[AddressPoints]) -> anyhow::Result<()>;
}

/// Pushes every address's grand total through the publisher in chunks of at
/// most `batch_size`.
pub async fn publish_on_chain(
    db: &Db,
    publisher: &dyn Publisher,
    batch_size: usize,
) -> Result<usize, LedgerError> {
    let totals = points::totals_by_address(db.pool()).await?;
    let pairs: Vec<AddressPoints> = totals
        .into_iter()
        .map(|(address, points)| AddressPoints { address, points })
        .collect();

    for chunk in pairs.chunks(batch_size.max(1)) {
        publisher.submit(chunk).await?;
        tracing::debug!("submitted chunk of {} totals", chunk.len());
    }

    Ok(pairs.len())
}
