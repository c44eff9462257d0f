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

//! Deployment configuration, loaded from a TOML file. Configuration problems
//! abort the invocation before any store mutation.

use std::{collections::HashMap, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds assumed to precede the very first batch when computing its
    /// time weight.
    pub default_interval: i64,
    /// First-degree referral bonus, percent of the referral's change.
    pub l1_percent: f64,
    /// Second-degree referral bonus, percent.
    pub l2_percent: f64,
    /// Canonical bech32 prefix every ingested address is re-encoded under.
    #[serde(default = "default_address_prefix")]
    pub address_prefix: String,
    pub pricefeed: PricefeedConfig,
    #[serde(default)]
    pub on_chain_storage: Option<OnChainStorageConfig>,
    pub protocols: HashMap<String, ProtocolConfig>,
}

fn default_address_prefix() -> String {
    "neutron".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricefeedConfig {
    /// LCD REST endpoint of the oracle's chain.
    pub rest: String,
    /// Oracle contract address.
    pub contract: String,
    /// Maximum height offset for the price snapshot.
    #[serde(default)]
    pub jitter: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnChainStorageConfig {
    /// Relayer endpoint the signed set-balances calls are posted to.
    pub endpoint: String,
    pub contract: String,
    pub sender: String,
    /// Pairs per contract call; defaults to 1000.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    pub source: SourceKind,
    /// LCD REST endpoint of the protocol's chain.
    pub rest: String,
    /// Maximum height offset for this protocol's tasks.
    #[serde(default)]
    pub jitter: u64,
    /// Holder contract, required by the `contract` source kind.
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default = "default_pagination_limit")]
    pub pagination_limit: u32,
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Reporting asset id (may carry a `_SUFFIX` qualifier) to chain denom.
    pub assets: HashMap<String, AssetConfig>,
}

fn default_pagination_limit() -> u32 {
    100
}

fn default_concurrency_limit() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub denom: String,
}

/// Closed set of source implementations; a protocol selects one by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Bank-module denom holders.
    Bank,
    /// CW20-style holder contract.
    Contract,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw).context("failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.protocols.is_empty() {
            bail!("no protocols configured");
        }
        for (protocol_id, protocol) in &self.protocols {
            if protocol.assets.is_empty() {
                bail!("protocol {protocol_id}: no assets configured");
            }
            if protocol.source == SourceKind::Contract && protocol.contract.is_none() {
                bail!("protocol {protocol_id}: the contract source requires a contract address");
            }
        }
        Ok(())
    }

    pub fn protocol(&self, protocol_id: &str) -> Result<&ProtocolConfig> {
        self.protocols
            .get(protocol_id)
            .with_context(|| format!("protocol {protocol_id} not found in config"))
    }
}
