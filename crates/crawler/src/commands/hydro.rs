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

//! Two-phase pot allocation: `prepare` computes a reviewable artifact from
//! the votes CSV, `merge` imports it into the ledger after operator review.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use points_ledger::{
    hydro::{self, HydroShare, WeightedEntry},
    Db,
};

const DEFAULT_POT_SIZE: i64 = 250_000;

#[derive(Subcommand, Clone, Debug)]
pub enum HydroCommands {
    /// Compute the pot allocation artifact from a votes CSV
    Prepare(HydroPrepare),
    /// Merge a reviewed allocation artifact into the public ledger
    Merge(HydroMerge),
}

impl HydroCommands {
    pub async fn run(&self, db: &Db, db_url: &str) -> Result<()> {
        match self {
            Self::Prepare(cmd) => cmd.run(),
            Self::Merge(cmd) => cmd.run(db, db_url).await,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct HydroPrepare {
    /// CSV file of votes: address, voting power, bid choice
    pub csv_file: PathBuf,

    /// Bid id whose voters share the pot
    pub bid_id: String,

    /// Pot of points to distribute proportionally among voters
    #[clap(short, long, default_value_t = DEFAULT_POT_SIZE)]
    pub pot: i64,

    /// Where to write the review artifact
    #[clap(short, long, default_value = "hydro_allocation.json")]
    pub output: PathBuf,
}

impl HydroPrepare {
    pub fn run(&self) -> Result<()> {
        let entries = read_votes(&self.csv_file, &self.bid_id)?;
        let shares = hydro::allocate(self.pot, &entries)?;

        let artifact = serde_json::to_string_pretty(&shares)?;
        std::fs::write(&self.output, artifact)
            .with_context(|| format!("failed to write {}", self.output.display()))?;
        println!(
            "prepared allocation of {} for {} voters, see {} for results",
            self.pot,
            shares.len(),
            self.output.display()
        );
        Ok(())
    }
}

fn read_votes(path: &Path, bid_id: &str) -> Result<Vec<WeightedEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to parse votes CSV")?;
        let (Some(address), Some(power), Some(choice)) =
            (record.get(0), record.get(1), record.get(2))
        else {
            bail!("malformed csv data, look for missing cells");
        };
        if address.trim().is_empty() || power.trim().is_empty() || choice.trim().is_empty() {
            bail!("malformed csv data, look for missing cells");
        }

        if choice.trim() == bid_id {
            entries.push(WeightedEntry {
                address: address.trim().to_string(),
                weight: power
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid voting power {power}"))?,
            });
        }
    }
    Ok(entries)
}

#[derive(Args, Clone, Debug)]
pub struct HydroMerge {
    /// Review artifact produced by `hydro prepare`
    #[clap(required_unless_present = "group_id")]
    pub json: Option<PathBuf>,

    /// Re-run the merge for an existing allocation group instead
    #[clap(short, long, conflicts_with = "json")]
    pub group_id: Option<i64>,

    /// Copy the database file into this directory before merging
    #[clap(short, long)]
    pub backup_dir: Option<PathBuf>,
}

impl HydroMerge {
    pub async fn run(&self, db: &Db, db_url: &str) -> Result<()> {
        if let Some(dir) = &self.backup_dir {
            let backup = backup_database(db_url, dir)?;
            tracing::info!("database backed up to {}", backup.display());
        }

        let stats = match (self.group_id, &self.json) {
            (Some(group_id), _) => hydro::merge_group(db, group_id).await?,
            (None, Some(path)) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let shares: Vec<HydroShare> =
                    serde_json::from_str(&raw).context("malformed allocation artifact")?;
                hydro::import_and_merge(db, &shares).await?
            }
            (None, None) => bail!("either an artifact file or --group-id is required"),
        };

        println!(
            "group {}: {} allocations imported, {} merged into the public ledger",
            stats.group_id, stats.imported, stats.merged
        );
        Ok(())
    }
}

fn backup_database(db_url: &str, dir: &Path) -> Result<PathBuf> {
    let path = db_url.strip_prefix("sqlite://").or_else(|| db_url.strip_prefix("sqlite:")).unwrap_or(db_url);
    if path.contains(":memory:") {
        bail!("cannot back up an in-memory database");
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create backup dir {}", dir.display()))?;
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let dest = dir.join(format!("backup-{stamp}.db"));
    std::fs::copy(path, &dest)
        .with_context(|| format!("failed to back up {path} to {}", dest.display()))?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn votes_are_filtered_by_bid_choice() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "neutron1aaa,50,3").unwrap();
        writeln!(file, "neutron1bbb,30,3").unwrap();
        writeln!(file, "neutron1ccc,20,7").unwrap();
        file.flush().unwrap();

        let entries = read_votes(file.path(), "3").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].address, "neutron1aaa");
        assert_eq!(entries[0].weight, 50);
    }

    #[test]
    fn missing_cells_are_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "neutron1aaa,50,3").unwrap();
        writeln!(file, "neutron1bbb,,3").unwrap();
        file.flush().unwrap();

        assert!(read_votes(file.path(), "3").is_err());
    }
}
