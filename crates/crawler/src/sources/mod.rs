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

//! Concrete balance source adapters behind the closed [`SourceKind`]
//! registry. Adding a protocol family means adding a variant and an arm
//! here; the engine never changes.

mod bank;
mod contract;

pub use bank::BankSource;
pub use contract::ContractSource;

use anyhow::{anyhow, Result};
use points_ledger::SourceObj;

use crate::config::{ProtocolConfig, SourceKind};

pub fn build(protocol_id: &str, config: &ProtocolConfig) -> Result<SourceObj> {
    Ok(match config.source {
        SourceKind::Bank => Box::new(BankSource::new(protocol_id, config)?),
        SourceKind::Contract => Box::new(ContractSource::new(protocol_id, config)?),
    })
}

/// Applies a schedule multiplier to a raw base-unit amount without leaving
/// integer arithmetic (four digits of multiplier precision).
pub(crate) fn scale_by_multiplier(amount: &str, multiplier: f64) -> Result<String> {
    let amount: u128 =
        amount.parse().map_err(|_| anyhow!("invalid base-unit amount {amount}"))?;
    let scaled = amount * (multiplier * 10_000.0).round() as u128 / 10_000;
    Ok(scaled.to_string())
}

/// Configured asset ids that the schedule selected for this run, in a stable
/// order. Every scheduled asset must be configured; a dangling schedule entry
/// is a configuration error, not something to skip.
pub(crate) fn scheduled_assets<'a>(
    protocol_id: &str,
    configured: impl Iterator<Item = &'a String>,
    multipliers: &std::collections::HashMap<String, f64>,
) -> Result<Vec<String>> {
    let configured: std::collections::HashSet<&String> = configured.collect();
    let mut selected = Vec::new();
    for asset_id in multipliers.keys() {
        if !configured.contains(asset_id) {
            return Err(anyhow!(
                "asset {asset_id} is scheduled but not configured for protocol {protocol_id}"
            ));
        }
        selected.push(asset_id.clone());
    }
    selected.sort();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_scaling_stays_integral() {
        assert_eq!(scale_by_multiplier("1000000", 1.0).unwrap(), "1000000");
        assert_eq!(scale_by_multiplier("1000000", 1.5).unwrap(), "1500000");
        assert_eq!(scale_by_multiplier("3", 0.5).unwrap(), "1");
        assert_eq!(scale_by_multiplier("1000000", 0.0).unwrap(), "0");
    }

    #[test]
    fn rejects_non_integer_amounts() {
        assert!(scale_by_multiplier("1.5", 1.0).is_err());
    }
}
