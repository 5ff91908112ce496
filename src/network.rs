//! Network reads: account state and shard lookup

use crate::types::AccountOnNetwork;
use async_trait::async_trait;
use eyre::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Idempotent account reads against the network
#[async_trait]
pub trait NetworkProvider: Send + Sync + fmt::Debug {
    /// Fetch balance, nonce and username for `address`
    async fn get_account(&self, address: &str) -> Result<AccountOnNetwork>;

    /// Shard the account lives in, if the API reports one
    async fn get_account_shard(&self, address: &str) -> Result<Option<u32>>;
}

#[derive(Debug, Deserialize)]
struct ShardResponse {
    #[serde(default)]
    shard: Option<u32>,
}

/// HTTP client for the network API (`{api}/accounts/{address}`)
#[derive(Debug, Clone)]
pub struct ApiClient {
    api_address: String,
    client: Client,
}

impl ApiClient {
    /// Create a client for the given API base URL
    pub fn new(api_address: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("DappSigningSDK/0.1.0")
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_address: api_address.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn account_url(&self, address: &str) -> String {
        format!("{}/accounts/{}", self.api_address, address)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            eyre::bail!("Request to {} failed: {} - {}", url, status, body);
        }

        resp.json().await.context("Failed to parse account response")
    }
}

#[async_trait]
impl NetworkProvider for ApiClient {
    async fn get_account(&self, address: &str) -> Result<AccountOnNetwork> {
        let url = self.account_url(address);
        let mut account: AccountOnNetwork = self.get_json(&url).await?;
        if account.address.is_empty() {
            account.address = address.to_string();
        }
        tracing::debug!("Fetched account {} nonce {}", address, account.nonce);
        Ok(account)
    }

    async fn get_account_shard(&self, address: &str) -> Result<Option<u32>> {
        let url = self.account_url(address);
        let resp: ShardResponse = self.get_json(&url).await?;
        Ok(resp.shard)
    }
}
