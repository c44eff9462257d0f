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

//! SQLite store layer. Each submodule owns the statements for one table
//! family; multi-table state transitions are composed by the engine modules
//! inside a single transaction.

pub mod accounts;
pub mod balances;
pub mod batches;
pub mod hydro;
pub mod points;
pub mod schedule;

use std::{str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQL error {0:?}")]
    SqlErr(#[from] sqlx::Error),

    #[error("SQL Migration error {0:?}")]
    MigrateErr(#[from] sqlx::migrate::MigrateError),

    #[error("Batch {0} not found")]
    BatchNotFound(i64),

    #[error("Malformed row: {0}")]
    BadRow(String),
}

/// Shared SQLite handle, passed explicitly into every component.
///
/// Writers from concurrently launched invocations are serialized by the WAL
/// journal plus the busy timeout; callers retry the whole step on contention.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Constructs a [Db] from an existing pool, applying migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Opens (creating if missing) the database at `conn_str`.
    pub async fn new(conn_str: &str) -> Result<Self, DbError> {
        let opts = SqliteConnectOptions::from_str(conn_str)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database is private to its connection; more than one
        // connection in the pool would each see an empty schema.
        let max_connections = if conn_str.contains(":memory:") { 1 } else { 5 };

        let pool =
            SqlitePoolOptions::new().max_connections(max_connections).connect_with(opts).await?;

        Self::from_pool(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, DbError> {
        Ok(self.pool.begin().await?)
    }
}
