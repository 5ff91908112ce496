//! Queue-driven mocks shared by the unit tests

use crate::error::SigningError;
use crate::network::NetworkProvider;
use crate::provider::{BridgeConnector, Capabilities, ConnectorEvent, DappProvider};
use crate::types::{AccountOnNetwork, Transaction};
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};

pub const ALICE: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
pub const BOB: &str = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx";

pub fn remote_account(address: &str, nonce: u64) -> AccountOnNetwork {
    AccountOnNetwork {
        address: address.to_string(),
        balance: "1000000000000000000".to_string(),
        nonce,
        username: String::new(),
        shard: Some(1),
    }
}

// ========== Network ==========

#[derive(Debug)]
struct QueuedResponse {
    result: std::result::Result<AccountOnNetwork, String>,
    gate: Option<Arc<Notify>>,
}

/// Network mock: pops queued responses, falls back to a fixed account
#[derive(Debug, Default)]
pub struct MockNetwork {
    queue: Mutex<VecDeque<QueuedResponse>>,
    fallback: Mutex<Option<AccountOnNetwork>>,
    requests: Mutex<Vec<String>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed(account: AccountOnNetwork) -> Self {
        let mock = Self::new();
        *mock.fallback.lock().unwrap() = Some(account);
        mock
    }

    pub fn push_account(&self, account: AccountOnNetwork) {
        self.queue.lock().unwrap().push_back(QueuedResponse {
            result: Ok(account),
            gate: None,
        });
    }

    pub fn push_error(&self, message: &str) {
        self.queue.lock().unwrap().push_back(QueuedResponse {
            result: Err(message.to_string()),
            gate: None,
        });
    }

    /// Queue a response that is only returned after the gate is notified
    pub fn push_gated_account(&self, account: AccountOnNetwork) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.queue.lock().unwrap().push_back(QueuedResponse {
            result: Ok(account),
            gate: Some(gate.clone()),
        });
        gate
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkProvider for MockNetwork {
    async fn get_account(&self, address: &str) -> Result<AccountOnNetwork> {
        self.requests.lock().unwrap().push(address.to_string());
        let queued = self.queue.lock().unwrap().pop_front();
        match queued {
            Some(response) => {
                if let Some(gate) = response.gate {
                    gate.notified().await;
                }
                response.result.map_err(|msg| eyre!(msg))
            }
            None => self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| eyre!("no response queued")),
        }
    }

    async fn get_account_shard(&self, address: &str) -> Result<Option<u32>> {
        self.get_account(address).await.map(|a| a.shard)
    }
}

// ========== Provider ==========

/// Provider mock with switchable behaviour
#[derive(Debug)]
pub struct MockProvider {
    capabilities: Capabilities,
    initialized: AtomicBool,
    init_result: bool,
    address: Mutex<Option<String>>,
    signature: Mutex<Option<String>>,
    connected: AtomicBool,
    fail_heartbeat: AtomicBool,
    heartbeats: AtomicUsize,
    address_calls: AtomicUsize,
    events: broadcast::Sender<ConnectorEvent>,
}

impl MockProvider {
    fn with_capabilities(capabilities: Capabilities) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            capabilities,
            initialized: AtomicBool::new(true),
            init_result: true,
            address: Mutex::new(Some(ALICE.to_string())),
            signature: Mutex::new(None),
            connected: AtomicBool::new(false),
            fail_heartbeat: AtomicBool::new(false),
            heartbeats: AtomicUsize::new(0),
            address_calls: AtomicUsize::new(0),
            events,
        }
    }

    pub fn wallet() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn ledger() -> Self {
        Self::with_capabilities(Capabilities {
            ledger: true,
            ..Default::default()
        })
    }

    pub fn extension() -> Self {
        Self::with_capabilities(Capabilities {
            extension: true,
            ..Default::default()
        })
    }

    /// Bridged provider with a live session
    pub fn bridged() -> Self {
        let provider = Self::with_capabilities(Capabilities {
            bridged_connector: true,
            ..Default::default()
        });
        provider.connected.store(true, Ordering::SeqCst);
        provider
    }

    /// Starts uninitialized; `init()` answers `init_result`
    pub fn uninitialized(mut self, init_result: bool) -> Self {
        self.initialized = AtomicBool::new(false);
        self.init_result = init_result;
        self
    }

    pub fn with_address(self, address: Option<&str>) -> Self {
        *self.address.lock().unwrap() = address.map(str::to_string);
        self
    }

    pub fn with_signature(self, signature: &str) -> Self {
        *self.signature.lock().unwrap() = Some(signature.to_string());
        self
    }

    pub fn fail_heartbeats(&self) {
        self.fail_heartbeat.store(true, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn emit(&self, event: ConnectorEvent) {
        let _ = self.events.send(event);
    }

    pub fn heartbeats(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }

    pub fn address_calls(&self) -> usize {
        self.address_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DappProvider for MockProvider {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn init(&self) -> Result<bool> {
        self.initialized.store(self.init_result, Ordering::SeqCst);
        Ok(self.init_result)
    }

    async fn get_address(&self) -> Result<String> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        self.address
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| eyre!("provider returned no address"))
    }

    async fn get_signature(&self) -> Result<Option<String>> {
        Ok(self.signature.lock().unwrap().clone())
    }

    async fn send_heartbeat(&self) -> Result<()> {
        if !self.capabilities.bridged_connector {
            return Err(SigningError::Unsupported("sendHeartbeat").into());
        }
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        if self.fail_heartbeat.load(Ordering::SeqCst) {
            eyre::bail!("relay closed");
        }
        Ok(())
    }

    async fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction> {
        let mut signed = tx.clone();
        signed.signature = Some(format!("sig-{}", tx.nonce));
        Ok(signed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connector_events(&self) -> Option<broadcast::Receiver<ConnectorEvent>> {
        self.capabilities
            .bridged_connector
            .then(|| self.events.subscribe())
    }
}

// ========== Bridge connector ==========

#[derive(Debug)]
struct ConnectorInner {
    connected: AtomicBool,
    address: String,
    messages: Mutex<Vec<String>>,
    events: broadcast::Sender<ConnectorEvent>,
}

/// Relay mock; clones share state
#[derive(Debug, Clone)]
pub struct MockConnector {
    inner: Arc<ConnectorInner>,
}

impl MockConnector {
    pub fn connected(address: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(ConnectorInner {
                connected: AtomicBool::new(true),
                address: address.to_string(),
                messages: Mutex::new(Vec::new()),
                events,
            }),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.connected.store(connected, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl BridgeConnector for MockConnector {
    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<bool> {
        Ok(self.is_connected())
    }

    async fn get_address(&self) -> Result<String> {
        Ok(self.inner.address.clone())
    }

    async fn get_signature(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn send_custom_message(&self, method: &str, _params: Value) -> Result<Value> {
        self.inner.messages.lock().unwrap().push(method.to_string());
        Ok(Value::Null)
    }

    async fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction> {
        Ok(tx.clone())
    }

    async fn disconnect(&self) -> Result<()> {
        self.set_connected(false);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent> {
        self.inner.events.subscribe()
    }
}
