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

//! Publisher implementation posting each chunk of totals to the signing
//! relayer. Signing and broadcast are the relayer's concern; the contract
//! applies set semantics, so re-posting the same chunk is safe.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use points_ledger::{AddressPoints, Publisher};
use url::Url;

use crate::config::OnChainStorageConfig;

pub struct HttpPublisher {
    http: reqwest::Client,
    endpoint: Url,
    contract: String,
    sender: String,
}

impl HttpPublisher {
    pub fn new(config: &OnChainStorageConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: Url::parse(&config.endpoint).context("invalid publisher endpoint")?,
            contract: config.contract.clone(),
            sender: config.sender.clone(),
        })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn submit(&self, points: &[AddressPoints]) -> Result<()> {
        let body = serde_json::json!({
            "contract": self.contract,
            "sender": self.sender,
            "balances": points,
        });
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .context("publisher request failed")?;
        if !response.status().is_success() {
            bail!("publisher rejected chunk with status {}", response.status());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn posts_chunk_with_contract_metadata() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/set-balances").json_body(serde_json::json!({
                "contract": "neutron1store",
                "sender": "neutron1sender",
                "balances": [{"address": "neutron1aaa", "points": 42}],
            }));
            then.status(200);
        });

        let publisher = HttpPublisher::new(&OnChainStorageConfig {
            endpoint: format!("{}/set-balances", server.base_url()),
            contract: "neutron1store".to_string(),
            sender: "neutron1sender".to_string(),
            batch_size: None,
        })
        .unwrap();

        publisher
            .submit(&[AddressPoints { address: "neutron1aaa".to_string(), points: 42 }])
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn rejected_chunks_are_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/set-balances");
            then.status(503);
        });

        let publisher = HttpPublisher::new(&OnChainStorageConfig {
            endpoint: format!("{}/set-balances", server.base_url()),
            contract: "neutron1store".to_string(),
            sender: "neutron1sender".to_string(),
            batch_size: None,
        })
        .unwrap();

        assert!(publisher
            .submit(&[AddressPoints { address: "neutron1aaa".to_string(), points: 1 }])
            .await
            .is_err());
    }
}
