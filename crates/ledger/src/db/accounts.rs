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

//! Referral edges, the address blacklist and KYC records.

use std::collections::HashSet;

use sqlx::SqliteExecutor;

use super::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Referral {
    pub referrer: String,
    pub referral: String,
    pub ts: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KycRecord {
    pub address: String,
    pub kyc_id: String,
    pub kyc_provider: String,
    pub ts: i64,
}

pub async fn add_referral(
    exec: impl SqliteExecutor<'_>,
    referrer: &str,
    referral: &str,
    ts: i64,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO referrals (referrer, referral, ts) VALUES ($1, $2, $3)")
        .bind(referrer)
        .bind(referral)
        .bind(ts)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn referrals_of(
    exec: impl SqliteExecutor<'_>,
    referrer: &str,
) -> Result<Vec<Referral>, DbError> {
    Ok(sqlx::query_as("SELECT referrer, referral, ts FROM referrals WHERE referrer = $1")
        .bind(referrer)
        .fetch_all(exec)
        .await?)
}

/// All edges created at or before `cutoff`; bonus propagation ignores later
/// edges so a referral cannot earn for batches that predate it.
pub async fn referral_edges(
    exec: impl SqliteExecutor<'_>,
    cutoff: i64,
) -> Result<Vec<Referral>, DbError> {
    Ok(sqlx::query_as("SELECT referrer, referral, ts FROM referrals WHERE ts <= $1")
        .bind(cutoff)
        .fetch_all(exec)
        .await?)
}

pub async fn all_referrers(exec: impl SqliteExecutor<'_>) -> Result<Vec<String>, DbError> {
    Ok(sqlx::query_scalar("SELECT DISTINCT referrer FROM referrals ORDER BY referrer")
        .fetch_all(exec)
        .await?)
}

pub async fn add_to_blacklist(
    exec: impl SqliteExecutor<'_>,
    address: &str,
) -> Result<(), DbError> {
    sqlx::query("INSERT OR IGNORE INTO blacklist (address) VALUES ($1)")
        .bind(address)
        .execute(exec)
        .await?;
    Ok(())
}

pub async fn remove_from_blacklist(
    exec: impl SqliteExecutor<'_>,
    address: &str,
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM blacklist WHERE address = $1").bind(address).execute(exec).await?;
    Ok(())
}

pub async fn upsert_kyc(exec: impl SqliteExecutor<'_>, record: &KycRecord) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_kyc (address, kyc_id, kyc_provider, ts) VALUES ($1, $2, $3, $4)
         ON CONFLICT (address) DO UPDATE SET
             kyc_id = excluded.kyc_id,
             kyc_provider = excluded.kyc_provider,
             ts = excluded.ts",
    )
    .bind(&record.address)
    .bind(&record.kyc_id)
    .bind(&record.kyc_provider)
    .bind(record.ts)
    .execute(exec)
    .await?;
    Ok(())
}

pub async fn get_kyc(
    exec: impl SqliteExecutor<'_>,
    address: &str,
) -> Result<Option<KycRecord>, DbError> {
    Ok(sqlx::query_as(
        "SELECT address, kyc_id, kyc_provider, ts FROM user_kyc WHERE address = $1",
    )
    .bind(address)
    .fetch_optional(exec)
    .await?)
}

/// Addresses holding a KYC record at or before `cutoff`.
pub async fn kyc_addresses(
    exec: impl SqliteExecutor<'_>,
    cutoff: i64,
) -> Result<HashSet<String>, DbError> {
    let rows: Vec<String> = sqlx::query_scalar("SELECT address FROM user_kyc WHERE ts <= $1")
        .bind(cutoff)
        .fetch_all(exec)
        .await?;
    Ok(rows.into_iter().collect())
}
