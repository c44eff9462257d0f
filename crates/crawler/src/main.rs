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

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use points_crawler::{commands::Command, config::Config};
use points_ledger::Db;

/// Protocol points crawler.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct MainArgs {
    /// Config file path
    #[clap(long, default_value = "config.toml")]
    config: PathBuf,

    /// DB connection string
    #[clap(long, env = "DB_PATH", default_value = "sqlite:data.db")]
    db: String,

    #[clap(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment variables from {:?}", path),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => bail!("failed to load .env file: {}", e),
    }

    let args = MainArgs::parse();
    run(args).await
}

async fn run(args: MainArgs) -> Result<()> {
    let MainArgs { config: config_path, db: db_url, command } = args;
    let config = Config::load(&config_path)?;
    let db = Db::new(&db_url).await.context("failed to open database")?;
    command.run(&db, &config, &db_url).await
}
