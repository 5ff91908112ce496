//! Bridged mobile wallet provider (WalletConnect-style relay)

use super::{Capabilities, ConnectorEvent, DappProvider};
use crate::constants::HEARTBEAT_METHOD;
use crate::error::SigningError;
use crate::types::Transaction;
use async_trait::async_trait;
use eyre::{Context, Result};
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Relay transport to the remote signer.
///
/// The relay protocol and the remote wallet's cryptography live behind this
/// trait; the provider only routes calls and events through it.
#[async_trait]
pub trait BridgeConnector: Send + Sync + fmt::Debug {
    /// Whether the relay session is currently established
    fn is_connected(&self) -> bool;

    /// Open (or restore) the relay session
    async fn connect(&self) -> Result<bool>;

    async fn get_address(&self) -> Result<String>;

    async fn get_signature(&self) -> Result<Option<String>>;

    async fn send_custom_message(&self, method: &str, params: Value) -> Result<Value>;

    async fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction>;

    async fn disconnect(&self) -> Result<()>;

    /// Login/logout/heartbeat-ack notifications from the relay
    fn subscribe(&self) -> broadcast::Receiver<ConnectorEvent>;
}

/// Provider backed by a [`BridgeConnector`]
#[derive(Debug)]
pub struct WalletConnectProvider<C: BridgeConnector> {
    connector: C,
    initialized: AtomicBool,
}

impl<C: BridgeConnector> WalletConnectProvider<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

#[async_trait]
impl<C: BridgeConnector + 'static> DappProvider for WalletConnectProvider<C> {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            bridged_connector: true,
            ..Default::default()
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    async fn init(&self) -> Result<bool> {
        let connected = self
            .connector
            .connect()
            .await
            .context("Failed to connect to bridge")?;
        self.initialized.store(connected, Ordering::Release);
        Ok(connected)
    }

    async fn get_address(&self) -> Result<String> {
        self.connector.get_address().await
    }

    async fn get_signature(&self) -> Result<Option<String>> {
        self.connector.get_signature().await
    }

    async fn send_heartbeat(&self) -> Result<()> {
        if !self.connector.is_connected() {
            return Err(SigningError::SessionLost("bridge not connected".into()).into());
        }
        self.connector
            .send_custom_message(HEARTBEAT_METHOD, json!({}))
            .await
            .context("Heartbeat not acknowledged")?;
        Ok(())
    }

    async fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction> {
        self.connector
            .sign_transaction(tx)
            .await
            .context("Remote signer rejected transaction")
    }

    fn is_connected(&self) -> bool {
        self.connector.is_connected()
    }

    fn connector_events(&self) -> Option<broadcast::Receiver<ConnectorEvent>> {
        Some(self.connector.subscribe())
    }

    async fn logout(&self) -> Result<()> {
        self.initialized.store(false, Ordering::Release);
        if self.connector.is_connected() {
            self.connector.disconnect().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{classify, ProviderVariant};
    use crate::test_utils::MockConnector;

    #[tokio::test]
    async fn test_heartbeat_goes_through_custom_message() {
        let connector = MockConnector::connected("erd1alice");
        let provider = WalletConnectProvider::new(connector.clone());

        tokio_test::assert_ok!(provider.send_heartbeat().await);
        assert_eq!(connector.messages(), vec![HEARTBEAT_METHOD.to_string()]);
        assert_eq!(classify(&provider, None), ProviderVariant::WalletConnect);
    }

    #[tokio::test]
    async fn test_heartbeat_fails_when_disconnected() {
        let connector = MockConnector::connected("erd1alice");
        connector.set_connected(false);
        let provider = WalletConnectProvider::new(connector.clone());

        let err = provider.send_heartbeat().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SigningError>(),
            Some(SigningError::SessionLost(_))
        ));
        assert!(connector.messages().is_empty());
    }

    #[tokio::test]
    async fn test_init_and_logout_track_initialized() {
        let connector = MockConnector::connected("erd1alice");
        let provider = WalletConnectProvider::new(connector.clone());
        assert!(!provider.is_initialized());

        assert!(provider.init().await.unwrap());
        assert!(provider.is_initialized());

        provider.logout().await.unwrap();
        assert!(!provider.is_initialized());
        assert!(!connector.is_connected());
    }
}
