//! Transaction types for the signing flow

use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Default gas price (1 gwei-equivalent in the smallest denomination)
pub const DEFAULT_GAS_PRICE: u64 = 1_000_000_000;

/// Default gas limit for a plain transfer
pub const DEFAULT_GAS_LIMIT: u64 = 50_000;

/// Unsigned (or provider-signed) transaction in the network's JSON shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub nonce: u64,
    /// Value in the smallest denomination, as a decimal string
    pub value: String,
    pub receiver: String,
    #[serde(default)]
    pub sender: String,
    pub gas_price: u64,
    pub gas_limit: u64,
    /// Plain-text payload; base64 on the wire
    #[serde(default, with = "data_base64", skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Transaction {
    /// Create a transfer of `value` to `receiver`; nonce is assigned at submit time
    pub fn new(receiver: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            nonce: 0,
            value: value.into(),
            receiver: receiver.into(),
            sender: String::new(),
            gas_price: DEFAULT_GAS_PRICE,
            gas_limit: DEFAULT_GAS_LIMIT,
            data: None,
            chain_id: "1".to_string(),
            version: 1,
            signature: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub fn is_signed(&self) -> bool {
        self.signature.as_deref().is_some_and(|s| !s.is_empty())
    }
}

mod data_base64 {
    use super::BASE64;
    use base64::Engine;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(data) => s.serialize_str(&BASE64.encode(data.as_bytes())),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .filter(|e| !e.is_empty())
            .map(|e| {
                let bytes = BASE64.decode(e).map_err(D::Error::custom)?;
                String::from_utf8(bytes).map_err(D::Error::custom)
            })
            .transpose()
    }
}

/// A signing request: transactions plus the route to return to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBatch {
    pub transactions: Vec<Transaction>,
    pub callback_route: String,
}

impl TransactionBatch {
    pub fn new(transactions: Vec<Transaction>, callback_route: impl Into<String>) -> Self {
        Self {
            transactions,
            callback_route: callback_route.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Outcome of a signing flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Loading,
    Cancelled,
    Completed,
}

/// Process-wide "signing in progress" indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SendStatus {
    pub loading: bool,
    pub status: Option<TxStatus>,
}

impl SendStatus {
    pub fn loading() -> Self {
        Self {
            loading: true,
            status: Some(TxStatus::Loading),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            loading: false,
            status: Some(TxStatus::Cancelled),
        }
    }

    pub fn completed() -> Self {
        Self {
            loading: false,
            status: Some(TxStatus::Completed),
        }
    }
}
