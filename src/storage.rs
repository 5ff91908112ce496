//! Key-value storage used for login markers and the nonce watermark
//!
//! Two scopes mirror the browser: `local` survives reloads and supports
//! expiring entries, `session` is per tab. Stores broadcast a
//! [`StorageEvent`] on every write so other contexts sharing the same store
//! can react (e.g. a logout in another tab).

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Current wall-clock time as unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A stored value with its optional expiry (unix seconds)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub data: Value,
    pub expires: Option<u64>,
}

impl StoredItem {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

/// Emitted after a key is written or removed
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<Value>,
}

/// Opaque get/set/expire store
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Raw entry including its expiry, even if already expired
    fn get_item(&self, key: &str) -> Option<StoredItem>;

    fn set_item(&self, key: &str, data: Value, expires: Option<u64>);

    fn remove_item(&self, key: &str);

    fn clear(&self);

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;

    /// Live value; expired entries read as absent
    fn get(&self, key: &str) -> Option<Value> {
        self.get_item(key)
            .filter(|item| !item.is_expired(unix_now()))
            .map(|item| item.data)
    }

    fn set(&self, key: &str, data: Value) {
        self.set_item(key, data, None);
    }

    fn set_with_ttl(&self, key: &str, data: Value, ttl: Duration) {
        self.set_item(key, data, Some(unix_now() + ttl.as_secs()));
    }
}

/// In-process store, shareable between contexts via `Arc`
pub struct MemoryStore {
    items: RwLock<HashMap<String, StoredItem>>,
    events: broadcast::Sender<StorageEvent>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("MemoryStore").field("items", &len).finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: RwLock::new(HashMap::new()),
            events,
        }
    }

    fn notify(&self, key: &str, new_value: Option<Value>) {
        // no subscribers is fine
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value,
        });
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<StoredItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, data: Value, expires: Option<u64>) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredItem {
                    data: data.clone(),
                    expires,
                },
            );
        self.notify(key, Some(data));
    }

    fn remove_item(&self, key: &str) {
        let removed = self
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if removed.is_some() {
            self.notify(key, None);
        }
    }

    fn clear(&self) {
        let keys: Vec<String> = self
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(key, _)| key)
            .collect();
        for key in keys {
            self.notify(&key, None);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}

/// Local (durable) and session (per-tab) stores
#[derive(Debug, Clone)]
pub struct Storage {
    pub local: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(local: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self { local, session }
    }

    /// Fresh in-memory stores for both scopes
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.set_item("nonce", json!(9), Some(unix_now() - 1));
        assert_eq!(store.get("nonce"), None);
        // raw entry is still there for callers that inspect the expiry
        assert!(store.get_item("nonce").unwrap().is_expired(unix_now()));

        store.set_with_ttl("nonce", json!(10), Duration::from_secs(3600));
        assert_eq!(store.get("nonce"), Some(json!(10)));
    }

    #[test]
    fn test_remove_and_clear_emit_events() {
        let store = MemoryStore::new();
        let mut events = store.subscribe();

        store.set("walletconnect", json!({"connected": true}));
        store.remove_item("walletconnect");
        store.remove_item("walletconnect");
        store.set("loginMethod", json!("ledger"));
        store.clear();

        let first = events.try_recv().unwrap();
        assert_eq!(first.key, "walletconnect");
        assert!(first.new_value.is_some());
        let second = events.try_recv().unwrap();
        assert_eq!(second.new_value, None);
        // removing a missing key is silent
        assert_eq!(events.try_recv().unwrap().key, "loginMethod");
        let cleared = events.try_recv().unwrap();
        assert_eq!(cleared.key, "loginMethod");
        assert_eq!(cleared.new_value, None);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_shared_store_is_visible_across_handles() {
        let shared: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let tab_a = Storage::new(shared.clone(), Arc::new(MemoryStore::new()));
        let tab_b = Storage::new(shared, Arc::new(MemoryStore::new()));

        tab_a.local.set("loginMethod", json!("walletconnect"));
        tab_a.session.set("walletLogin", json!(true));

        assert_eq!(tab_b.local.get("loginMethod"), Some(json!("walletconnect")));
        assert_eq!(tab_b.session.get("walletLogin"), None);
    }
}
