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

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use points_ledger::{
    db::schedule::{self, NewRule},
    Db,
};

use crate::config::Config;

/// Manage multiplier schedule rules. Rules are superseded by inserting new
/// rows, never edited in place.
#[derive(Subcommand, Clone, Debug)]
pub enum ScheduleCommands {
    /// Add a schedule rule
    Add(ScheduleAdd),
    /// Display the schedule
    List(ScheduleList),
    /// Delete a schedule rule
    Delete(ScheduleDelete),
}

impl ScheduleCommands {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        match self {
            Self::Add(cmd) => cmd.run(db, config).await,
            Self::List(cmd) => cmd.run(db).await,
            Self::Delete(cmd) => cmd.run(db).await,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct ScheduleAdd {
    /// Protocol id
    pub protocol_id: String,

    /// Asset id (dATOM, dTIA, a suffixed variant like dATOM_NTRN, ...)
    pub asset_id: String,

    /// Window start, RFC 3339 (or 0 together with end=0 for always-active)
    pub start: String,

    /// Window end, RFC 3339, exclusive (or 0 for always-active)
    pub end: String,

    /// Multiplier applied to the asset's balances
    pub multiplier: f64,

    /// Whether the rule is enabled
    pub enabled: bool,

    /// Skip the overlapping-rule check
    #[clap(short, long)]
    pub force: bool,
}

fn parse_window_bound(raw: &str) -> Result<i64> {
    if raw == "0" {
        return Ok(0);
    }
    Ok(chrono::DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid datetime {raw}"))?
        .timestamp())
}

impl ScheduleAdd {
    pub async fn run(&self, db: &Db, config: &Config) -> Result<()> {
        // unknown protocols and assets are configuration errors, fatal
        // before any mutation
        let protocol = config.protocol(&self.protocol_id)?;
        if !protocol.assets.contains_key(&self.asset_id) {
            bail!("asset {} not found for protocol {}", self.asset_id, self.protocol_id);
        }

        let start_ts = parse_window_bound(&self.start)?;
        let end_ts = parse_window_bound(&self.end)?;
        let sentinel = start_ts == 0 && end_ts == 0;
        if !sentinel && start_ts >= end_ts {
            bail!("end date must be greater than start date");
        }

        if !self.force
            && schedule::overlapping_rule_exists(
                db.pool(),
                &self.protocol_id,
                &self.asset_id,
                start_ts,
                end_ts,
            )
            .await?
        {
            bail!("a schedule rule for this timeframe already exists (use --force to override)");
        }

        let schedule_id = schedule::insert_rule(
            db.pool(),
            &NewRule {
                protocol_id: &self.protocol_id,
                asset_id: &self.asset_id,
                multiplier: self.multiplier,
                start_ts,
                end_ts,
                enabled: self.enabled,
            },
        )
        .await?;
        println!("schedule rule {schedule_id} has been inserted");
        Ok(())
    }
}

#[derive(Args, Clone, Debug)]
pub struct ScheduleList {}

impl ScheduleList {
    pub async fn run(&self, db: &Db) -> Result<()> {
        for rule in schedule::list_rules(db.pool()).await? {
            println!(
                "id: {}\tprotocol: {}\tasset: {}\tmul: {}\tstart: {}\tend: {}\t{}",
                rule.schedule_id,
                rule.protocol_id,
                rule.asset_id,
                rule.multiplier,
                rule.start_ts,
                rule.end_ts,
                if rule.enabled { "enabled" } else { "disabled" },
            );
        }
        Ok(())
    }
}

#[derive(Args, Clone, Debug)]
pub struct ScheduleDelete {
    /// Schedule rule id
    pub schedule_id: i64,
}

impl ScheduleDelete {
    pub async fn run(&self, db: &Db) -> Result<()> {
        if !schedule::delete_rule(db.pool(), self.schedule_id).await? {
            bail!("schedule rule {} not found", self.schedule_id);
        }
        println!("schedule rule {} has been deleted", self.schedule_id);
        Ok(())
    }
}
