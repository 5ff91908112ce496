//! Nonce assignment and the locally persisted nonce watermark
//!
//! The network's account nonce lags behind transactions that were just
//! handed to a signer. After every dispatch the next free nonce is written to
//! local storage with an expiry, and account refreshes take the max of the
//! remote nonce and that watermark until the network catches up or the
//! watermark expires.

use crate::constants::NONCE_KEY;
use crate::state::{Action, AppState};
use crate::storage::{unix_now, KeyValueStore, Storage};
use crate::types::{Account, Transaction};
use serde_json::{json, Value};
use std::time::Duration;

/// Persisted nonce floor as read back from storage
#[derive(Debug, Clone, PartialEq)]
pub struct NonceWatermark {
    /// Raw stored value; may be unparsable
    pub value: Value,
    /// Unix seconds after which the watermark is ignored
    pub expires: Option<u64>,
}

impl NonceWatermark {
    pub fn new(value: u64, expires: u64) -> Self {
        Self {
            value: json!(value),
            expires: Some(expires),
        }
    }

    /// Load the raw watermark, expired or not
    pub fn read(store: &dyn KeyValueStore) -> Option<Self> {
        store.get_item(NONCE_KEY).map(|item| Self {
            value: item.data,
            expires: item.expires,
        })
    }

    /// The watermark as a non-negative integer, if it parses as one
    pub fn parsed(&self) -> Option<u64> {
        match &self.value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Parsed value if still live
    pub fn effective(&self, now: u64) -> Option<u64> {
        if self.is_expired(now) {
            None
        } else {
            self.parsed()
        }
    }
}

/// Effective base nonce: `max(remote, watermark)` when the watermark is live
/// and valid, else `remote`.
pub fn resolve_base_nonce(remote: u64, watermark: Option<&NonceWatermark>, now: u64) -> u64 {
    match watermark.and_then(|w| w.effective(now)) {
        Some(local) => remote.max(local),
        None => remote,
    }
}

/// Base nonce for `remote`, merged with whatever watermark is stored now
pub fn latest_nonce(store: &dyn KeyValueStore, remote: u64) -> u64 {
    resolve_base_nonce(remote, NonceWatermark::read(store).as_ref(), unix_now())
}

/// Give transaction `i` the nonce `base + i`, in batch order
pub fn assign_sequential(transactions: &mut [Transaction], base: u64) {
    for (i, tx) in transactions.iter_mut().enumerate() {
        tx.set_nonce(base + i as u64);
    }
}

/// Persist `value` as the watermark for `ttl`
pub fn persist_watermark(store: &dyn KeyValueStore, value: u64, ttl: Duration) {
    store.set_with_ttl(NONCE_KEY, json!(value), ttl);
}

/// Record `nonce` as the next free nonce: persist the watermark and publish
/// the account with the new nonce.
pub fn set_nonce(state: &AppState, storage: &Storage, nonce: u64, ttl: Duration) {
    persist_watermark(storage.local.as_ref(), nonce, ttl);

    let account = state.read(|s| Account {
        address: s.address.clone(),
        nonce,
        ..s.account.clone()
    });
    tracing::debug!("Nonce watermark for {} set to {}", account.address, nonce);
    state.dispatch(Action::SetAccount(account));
}
