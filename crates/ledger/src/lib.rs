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

//! Batch/task lifecycle state machine and points ledger engine.
//!
//! A crawl cycle opens a point-in-time snapshot (a *batch*) with one balance
//! ingestion *task* per active protocol at a jittered chain height. Once all
//! tasks are ready the batch's balance and price snapshots are converted into
//! per-address, per-asset-family point deltas, which compound into a public
//! ledger with two-level referral bonuses and leaderboard ranking. A one-off
//! proportional reward pot can be merged into the same ledger idempotently.

pub mod batch;
pub mod db;
pub mod hydro;
pub mod ingest;
pub mod points;
pub mod pricefeed;
pub mod publish;
pub mod publisher;
pub mod source;

use thiserror::Error;

pub use db::{Db, DbError};
pub use pricefeed::PriceFeed;
pub use publisher::{AddressPoints, Publisher, DEFAULT_PUBLISH_BATCH_SIZE};
pub use source::{BalanceSink, Source, SourceObj, UserBalance};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// Precondition: a batch needs at least one schedule-active protocol.
    #[error("no protocol schedule is active at timestamp {0}")]
    NoActiveProtocols(i64),

    /// Configuration: the schedule references a protocol the deployment does
    /// not configure.
    #[error("protocol {0} is not configured")]
    UnknownProtocol(String),

    #[error("no pending task for protocol {protocol_id}")]
    NoPendingTask { protocol_id: String },

    #[error("not all tasks are ready for batch {batch_id}")]
    TasksNotReady { batch_id: i64 },

    #[error("invalid bech32 address: {0}")]
    BadAddress(String),

    #[error("invalid amount: {0}")]
    BadAmount(String),

    /// Data integrity: an allocation with nothing to credit or no one to
    /// credit it to must stop the merge.
    #[error("allocation {id} has no usable {field}")]
    MalformedAllocation { id: i64, field: &'static str },

    #[error("allocation requires a positive pot and at least one positive weight")]
    EmptyAllocation,

    /// Data integrity: the unique (address, asset) index was bypassed.
    #[error("duplicate public ledger rows for ({address}, {asset_id})")]
    DuplicateLedgerRow { address: String, asset_id: String },

    /// Adapter and oracle failures propagate unchanged; the invoking step
    /// aborts without committing partial state.
    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(DbError::from(err))
    }
}

impl LedgerError {
    /// Precondition failures are reported and the step exits cleanly without
    /// mutating state; everything else is an operator-visible failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoActiveProtocols(_)
                | Self::NoPendingTask { .. }
                | Self::TasksNotReady { .. }
        )
    }
}
