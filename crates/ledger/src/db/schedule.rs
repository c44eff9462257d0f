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

//! Multiplier schedule rules. Rules are superseded by inserting new rows,
//! never mutated; per (protocol, asset) the highest-id enabled rule whose
//! `[start_ts, end_ts)` window contains the evaluation time wins, with
//! `start_ts = end_ts = 0` acting as an always-active sentinel.

use std::collections::HashMap;

use sqlx::SqliteExecutor;

use super::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRule {
    pub schedule_id: i64,
    pub protocol_id: String,
    pub asset_id: String,
    pub multiplier: f64,
    pub start_ts: i64,
    pub end_ts: i64,
    pub enabled: bool,
}

impl ScheduleRule {
    /// Whether the rule's window covers `ts`.
    pub fn covers(&self, ts: i64) -> bool {
        (self.start_ts == 0 && self.end_ts == 0) || (self.start_ts <= ts && ts < self.end_ts)
    }
}

pub struct NewRule<'a> {
    pub protocol_id: &'a str,
    pub asset_id: &'a str,
    pub multiplier: f64,
    pub start_ts: i64,
    pub end_ts: i64,
    pub enabled: bool,
}

pub async fn insert_rule(
    exec: impl SqliteExecutor<'_>,
    rule: &NewRule<'_>,
) -> Result<i64, DbError> {
    let res = sqlx::query(
        "INSERT INTO schedule (protocol_id, asset_id, multiplier, start_ts, end_ts, enabled)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(rule.protocol_id)
    .bind(rule.asset_id)
    .bind(rule.multiplier)
    .bind(rule.start_ts)
    .bind(rule.end_ts)
    .bind(rule.enabled)
    .execute(exec)
    .await?;

    Ok(res.last_insert_rowid())
}

pub async fn list_rules(exec: impl SqliteExecutor<'_>) -> Result<Vec<ScheduleRule>, DbError> {
    Ok(sqlx::query_as(
        "SELECT schedule_id, protocol_id, asset_id, multiplier, start_ts, end_ts, enabled
         FROM schedule ORDER BY protocol_id, asset_id, start_ts, end_ts",
    )
    .fetch_all(exec)
    .await?)
}

/// Deletes a rule, returning whether a row existed.
pub async fn delete_rule(exec: impl SqliteExecutor<'_>, schedule_id: i64) -> Result<bool, DbError> {
    let res = sqlx::query("DELETE FROM schedule WHERE schedule_id = $1")
        .bind(schedule_id)
        .execute(exec)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Checks for an enabled rule with the same key and an overlapping window,
/// used by `schedule add` to refuse accidental duplicates.
pub async fn overlapping_rule_exists(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    asset_id: &str,
    start_ts: i64,
    end_ts: i64,
) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM schedule
         WHERE protocol_id = $1 AND asset_id = $2 AND enabled = 1
           AND start_ts >= $3 AND end_ts <= $4",
    )
    .bind(protocol_id)
    .bind(asset_id)
    .bind(start_ts)
    .bind(end_ts)
    .fetch_one(exec)
    .await?;
    Ok(count > 0)
}

/// Distinct protocols with an enabled rule covering `ts`.
pub async fn active_protocols(
    exec: impl SqliteExecutor<'_>,
    ts: i64,
) -> Result<Vec<String>, DbError> {
    Ok(sqlx::query_scalar(
        "SELECT DISTINCT protocol_id FROM schedule
         WHERE enabled = 1
           AND ((start_ts = 0 AND end_ts = 0) OR (start_ts <= $1 AND $1 < end_ts))
         ORDER BY protocol_id",
    )
    .bind(ts)
    .fetch_all(exec)
    .await?)
}

/// Distinct protocols with any enabled rule, regardless of window. Manual
/// task creation uses this set since the operator supplies the timestamp.
pub async fn enabled_protocols(exec: impl SqliteExecutor<'_>) -> Result<Vec<String>, DbError> {
    Ok(sqlx::query_scalar(
        "SELECT DISTINCT protocol_id FROM schedule WHERE enabled = 1 ORDER BY protocol_id",
    )
    .fetch_all(exec)
    .await?)
}

/// All distinct asset ids that ever appeared in the schedule.
pub async fn all_asset_ids(exec: impl SqliteExecutor<'_>) -> Result<Vec<String>, DbError> {
    Ok(sqlx::query_scalar("SELECT DISTINCT asset_id FROM schedule ORDER BY asset_id")
        .fetch_all(exec)
        .await?)
}

/// Resolves the multiplier map for one protocol at `ts` from a rule set.
///
/// Per asset the highest-id enabled covering rule wins; disabled and
/// non-matching rules are excluded entirely rather than zeroed.
pub fn resolve_multipliers(rules: &[ScheduleRule], ts: i64) -> HashMap<String, f64> {
    let mut winners: HashMap<&str, &ScheduleRule> = HashMap::new();
    for rule in rules {
        if !rule.enabled || !rule.covers(ts) {
            continue;
        }
        match winners.get(rule.asset_id.as_str()) {
            Some(current) if current.schedule_id >= rule.schedule_id => {}
            _ => {
                winners.insert(rule.asset_id.as_str(), rule);
            }
        }
    }
    winners.into_values().map(|r| (r.asset_id.clone(), r.multiplier)).collect()
}

/// Multiplier map for `protocol_id` at the timestamp of an open batch.
pub async fn multipliers_for_protocol(
    exec: impl SqliteExecutor<'_>,
    protocol_id: &str,
    ts: i64,
) -> Result<HashMap<String, f64>, DbError> {
    let rules: Vec<ScheduleRule> = sqlx::query_as(
        "SELECT schedule_id, protocol_id, asset_id, multiplier, start_ts, end_ts, enabled
         FROM schedule WHERE protocol_id = $1",
    )
    .bind(protocol_id)
    .fetch_all(exec)
    .await?;

    Ok(resolve_multipliers(&rules, ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, asset: &str, mult: f64, start: i64, end: i64, enabled: bool) -> ScheduleRule {
        ScheduleRule {
            schedule_id: id,
            protocol_id: "neutron".to_string(),
            asset_id: asset.to_string(),
            multiplier: mult,
            start_ts: start,
            end_ts: end,
            enabled,
        }
    }

    #[test]
    fn highest_id_wins_on_overlap() {
        let rules = vec![
            rule(1, "dATOM", 1.0, 100, 200, true),
            rule(2, "dATOM", 1.5, 100, 200, true),
        ];
        let muls = resolve_multipliers(&rules, 150);
        assert_eq!(muls.len(), 1);
        assert_eq!(muls["dATOM"], 1.5);
    }

    #[test]
    fn sentinel_rule_always_matches() {
        let rules = vec![rule(1, "dATOM", 2.0, 0, 0, true)];
        assert_eq!(resolve_multipliers(&rules, 0)["dATOM"], 2.0);
        assert_eq!(resolve_multipliers(&rules, i64::MAX)["dATOM"], 2.0);
    }

    #[test]
    fn window_is_half_open() {
        let rules = vec![rule(1, "dATOM", 1.0, 100, 200, true)];
        assert!(resolve_multipliers(&rules, 99).is_empty());
        assert_eq!(resolve_multipliers(&rules, 100).len(), 1);
        assert_eq!(resolve_multipliers(&rules, 199).len(), 1);
        assert!(resolve_multipliers(&rules, 200).is_empty());
    }

    #[test]
    fn disabled_rules_are_excluded_not_zeroed() {
        let rules = vec![
            rule(1, "dATOM", 1.0, 100, 200, true),
            rule(2, "dATOM", 9.0, 100, 200, false),
            rule(3, "dTIA", 3.0, 100, 200, false),
        ];
        let muls = resolve_multipliers(&rules, 150);
        // the disabled id-2 rule does not shadow the enabled id-1 rule
        assert_eq!(muls["dATOM"], 1.0);
        assert!(!muls.contains_key("dTIA"));
    }

    #[test]
    fn windowed_rule_beats_sentinel_only_by_id() {
        let rules = vec![
            rule(5, "dATOM", 1.0, 0, 0, true),
            rule(3, "dATOM", 2.0, 100, 200, true),
        ];
        assert_eq!(resolve_multipliers(&rules, 150)["dATOM"], 1.0);
        // outside the window only the sentinel matches
        assert_eq!(resolve_multipliers(&rules, 300)["dATOM"], 1.0);
    }
}
