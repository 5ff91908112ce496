//! Hosted web wallet provider (redirect signing)

use super::{Capabilities, DappProvider};
use crate::types::Transaction;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use eyre::{Context, Result};
use reqwest::Url;

const SIGN_TRANSACTIONS_PATH: &str = "/hook/transaction";

/// Signs by sending the user to the hosted wallet, which redirects back to
/// `callbackUrl` when done. Nothing is signed in-process.
#[derive(Debug, Clone)]
pub struct WalletProvider {
    wallet_address: String,
}

impl WalletProvider {
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the wallet hook URL carrying the whole batch.
    ///
    /// Each transaction field becomes an indexed query parameter
    /// (`receiver[0]`, `receiver[1]`, ...) in batch order.
    pub fn sign_transactions_url(
        &self,
        transactions: &[Transaction],
        callback_url: &str,
    ) -> Result<Url> {
        let mut url: Url = format!("{}{}", self.wallet_address, SIGN_TRANSACTIONS_PATH)
            .parse()
            .context("Invalid wallet address")?;

        {
            let mut query = url.query_pairs_mut();
            for (i, tx) in transactions.iter().enumerate() {
                let fields = [
                    ("nonce", tx.nonce.to_string()),
                    ("value", tx.value.clone()),
                    ("receiver", tx.receiver.clone()),
                    ("gasPrice", tx.gas_price.to_string()),
                    ("gasLimit", tx.gas_limit.to_string()),
                    (
                        "data",
                        tx.data
                            .as_deref()
                            .map(|d| BASE64.encode(d.as_bytes()))
                            .unwrap_or_default(),
                    ),
                    ("chainID", tx.chain_id.clone()),
                    ("version", tx.version.to_string()),
                ];
                for (name, value) in fields {
                    query.append_pair(&format!("{}[{}]", name, i), &value);
                }
            }
            query.append_pair("callbackUrl", callback_url);
        }

        Ok(url)
    }
}

#[async_trait]
impl DappProvider for WalletProvider {
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn is_initialized(&self) -> bool {
        true
    }

    async fn init(&self) -> Result<bool> {
        Ok(true)
    }
}
