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

//! Minimal Cosmos LCD REST client: latest height, historical smart queries
//! and bank denom-owner pagination. Archive nodes serve historical state when
//! the height header is set.

use anyhow::{bail, Context, Result};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// Header selecting the height a query executes at.
pub const BLOCK_HEIGHT_HEADER: &str = "x-cosmos-block-height";

pub struct LcdClient {
    http: reqwest::Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
pub struct DenomOwnersPage {
    #[serde(default)]
    pub denom_owners: Vec<DenomOwner>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct DenomOwner {
    pub address: String,
    pub balance: Coin,
}

#[derive(Debug, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub next_key: Option<String>,
}

impl LcdClient {
    pub fn new(base: &str) -> Result<Self> {
        // a trailing slash keeps Url::join from eating the last path segment
        let base = if base.ends_with('/') { base.to_string() } else { format!("{base}/") };
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(&base).context("invalid REST endpoint")?,
        })
    }

    pub async fn latest_height(&self) -> Result<u64> {
        #[derive(Deserialize)]
        struct Response {
            block: Block,
        }
        #[derive(Deserialize)]
        struct Block {
            header: Header,
        }
        #[derive(Deserialize)]
        struct Header {
            height: String,
        }

        let url = self.endpoint("cosmos/base/tendermint/v1beta1/blocks/latest")?;
        let response: Response = self.get_json(&url, None).await?;
        response.block.header.height.parse().context("malformed block height")
    }

    /// CosmWasm smart query executed at `height`.
    pub async fn smart_query<T: DeserializeOwned>(
        &self,
        contract: &str,
        height: u64,
        msg: &serde_json::Value,
    ) -> Result<T> {
        #[derive(Deserialize)]
        struct Response<T> {
            data: T,
        }

        let payload = base64::engine::general_purpose::STANDARD.encode(msg.to_string());
        // '+' and '/' are path-hostile; gateways accept the escaped form
        let payload = payload.replace('+', "%2B").replace('/', "%2F");
        let url = self.endpoint(&format!("cosmwasm/wasm/v1/contract/{contract}/smart/{payload}"))?;
        let response: Response<T> = self.get_json(&url, Some(height)).await?;
        Ok(response.data)
    }

    /// One page of a denom's holders at `height`.
    pub async fn denom_owners(
        &self,
        denom: &str,
        height: u64,
        limit: u32,
        key: Option<&str>,
    ) -> Result<DenomOwnersPage> {
        // factory denoms embed slashes that must stay encoded in the path
        let denom = denom.replace('/', "%2F");
        let mut url = self.endpoint(&format!("cosmos/bank/v1beta1/denom_owners/{denom}"))?;
        url.query_pairs_mut().append_pair("pagination.limit", &limit.to_string());
        if let Some(key) = key {
            url.query_pairs_mut().append_pair("pagination.key", key);
        }
        self.get_json(&url, Some(height)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).with_context(|| format!("invalid endpoint path {path}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url, height: Option<u64>) -> Result<T> {
        let mut request = self.http.get(url.clone());
        if let Some(height) = height {
            request = request.header(BLOCK_HEIGHT_HEADER, height.to_string());
        }
        let response =
            request.send().await.with_context(|| format!("request to {url} failed"))?;
        if !response.status().is_success() {
            bail!("request to {url} failed with status {}", response.status());
        }
        response.json().await.with_context(|| format!("malformed response from {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn fetches_latest_height() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/cosmos/base/tendermint/v1beta1/blocks/latest");
            then.status(200)
                .json_body(serde_json::json!({"block": {"header": {"height": "12345"}}}));
        });

        let lcd = LcdClient::new(&server.base_url()).unwrap();
        assert_eq!(lcd.latest_height().await.unwrap(), 12345);
    }

    #[tokio::test]
    async fn smart_query_sets_height_header() {
        let server = MockServer::start();
        let query = base64::engine::general_purpose::STANDARD
            .encode(serde_json::json!({"price": {"denom": "dATOM"}}).to_string());
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(format!("/cosmwasm/wasm/v1/contract/neutron1oracle/smart/{query}"))
                .header(BLOCK_HEIGHT_HEADER, "777");
            then.status(200).json_body(serde_json::json!({"data": {"price": "1.25"}}));
        });

        #[derive(Deserialize)]
        struct PriceResponse {
            price: String,
        }

        let lcd = LcdClient::new(&server.base_url()).unwrap();
        let response: PriceResponse = lcd
            .smart_query("neutron1oracle", 777, &serde_json::json!({"price": {"denom": "dATOM"}}))
            .await
            .unwrap();
        assert_eq!(response.price, "1.25");
        mock.assert();
    }

    #[tokio::test]
    async fn error_statuses_propagate() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/cosmos/base/tendermint/v1beta1/blocks/latest");
            then.status(500);
        });

        let lcd = LcdClient::new(&server.base_url()).unwrap();
        assert!(lcd.latest_height().await.is_err());
    }
}
