//! Signing provider abstraction
//!
//! Every backend (hosted wallet redirect, hardware ledger, browser extension,
//! bridged mobile wallet) sits behind [`DappProvider`]. A variant implements
//! the calls it supports; the defaults answer [`SigningError::Unsupported`].
//! Which variant is active is decided structurally by [`classify`] from the
//! handle's [`Capabilities`], never cached by identity.

mod wallet;
mod walletconnect;

pub use wallet::WalletProvider;
pub use walletconnect::{BridgeConnector, WalletConnectProvider};

use crate::error::SigningError;
use crate::types::{LoginMethod, Transaction};
use async_trait::async_trait;
use eyre::Result;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared handle to the active provider
pub type ProviderHandle = Arc<dyn DappProvider>;

/// Capability markers a provider exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Browser extension signer
    pub extension: bool,
    /// Hardware ledger app
    pub ledger: bool,
    /// Relay-bridged connector with its own event stream
    pub bridged_connector: bool,
}

/// Which signing backend is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderVariant {
    WalletRedirect,
    Ledger,
    Extension,
    WalletConnect,
}

impl ProviderVariant {
    /// Redirect signing leaves the app; every other variant signs in place
    pub fn signs_in_place(&self) -> bool {
        !matches!(self, ProviderVariant::WalletRedirect)
    }
}

/// Events raised by a bridged connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorEvent {
    /// Remote signer approved the session
    Login,
    /// Remote signer ended the session
    Logout,
    /// Acknowledgement of a heartbeat
    Heartbeat,
}

/// Uniform surface over the signing backends
#[async_trait]
pub trait DappProvider: Send + Sync + fmt::Debug {
    fn capabilities(&self) -> Capabilities;

    fn is_initialized(&self) -> bool;

    /// Returns `false` when the backend declined to initialize
    async fn init(&self) -> Result<bool>;

    async fn get_address(&self) -> Result<String> {
        Err(SigningError::Unsupported("getAddress").into())
    }

    /// Login signature, `None` when the signer produced none
    async fn get_signature(&self) -> Result<Option<String>> {
        Err(SigningError::Unsupported("getSignature").into())
    }

    async fn send_heartbeat(&self) -> Result<()> {
        Err(SigningError::Unsupported("sendHeartbeat").into())
    }

    async fn sign_transaction(&self, _tx: &Transaction) -> Result<Transaction> {
        Err(SigningError::Unsupported("signTransaction").into())
    }

    /// Whether a live remote session is attached (bridged variant only)
    fn is_connected(&self) -> bool {
        false
    }

    /// Connector event stream (bridged variant only)
    fn connector_events(&self) -> Option<broadcast::Receiver<ConnectorEvent>> {
        None
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }
}

/// Classify the active provider.
///
/// Priority: extension login flag, ledger marker, bridged marker, then the
/// hosted wallet redirect as the fallback.
pub fn classify(provider: &dyn DappProvider, login_method: Option<LoginMethod>) -> ProviderVariant {
    classify_capabilities(provider.capabilities(), login_method)
}

/// Pure classification over a capability snapshot
pub fn classify_capabilities(
    capabilities: Capabilities,
    login_method: Option<LoginMethod>,
) -> ProviderVariant {
    if login_method == Some(LoginMethod::Extension) || capabilities.extension {
        ProviderVariant::Extension
    } else if capabilities.ledger {
        ProviderVariant::Ledger
    } else if capabilities.bridged_connector {
        ProviderVariant::WalletConnect
    } else {
        ProviderVariant::WalletRedirect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockProvider;

    #[test]
    fn test_priority_order() {
        let all = Capabilities {
            extension: true,
            ledger: true,
            bridged_connector: true,
        };
        assert_eq!(classify_capabilities(all, None), ProviderVariant::Extension);

        let ledger_and_bridge = Capabilities {
            ledger: true,
            bridged_connector: true,
            ..Default::default()
        };
        assert_eq!(
            classify_capabilities(ledger_and_bridge, None),
            ProviderVariant::Ledger
        );

        let bridge = Capabilities {
            bridged_connector: true,
            ..Default::default()
        };
        assert_eq!(
            classify_capabilities(bridge, None),
            ProviderVariant::WalletConnect
        );
        assert_eq!(
            classify_capabilities(Capabilities::default(), None),
            ProviderVariant::WalletRedirect
        );
    }

    #[test]
    fn test_extension_login_flag_wins() {
        let ledger = Capabilities {
            ledger: true,
            ..Default::default()
        };
        assert_eq!(
            classify_capabilities(ledger, Some(LoginMethod::Extension)),
            ProviderVariant::Extension
        );
        assert_eq!(
            classify_capabilities(ledger, Some(LoginMethod::Wallet)),
            ProviderVariant::Ledger
        );

        // the handle's own marker counts before any login is persisted
        assert_eq!(classify(&MockProvider::extension(), None), ProviderVariant::Extension);
    }

    #[test]
    fn test_same_capabilities_same_variant() {
        let a = MockProvider::ledger();
        let b = MockProvider::ledger();
        assert_eq!(classify(&a, None), classify(&b, None));
        assert_eq!(classify(&a, None), ProviderVariant::Ledger);
        assert!(ProviderVariant::Ledger.signs_in_place());
        assert!(!ProviderVariant::WalletRedirect.signs_in_place());
    }

    #[tokio::test]
    async fn test_unsupported_defaults() {
        let wallet = WalletProvider::new("https://wallet.example.com");
        let err = wallet.send_heartbeat().await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<SigningError>(),
            Some(&SigningError::Unsupported("sendHeartbeat"))
        );
        assert!(wallet.connector_events().is_none());
        assert!(!wallet.is_connected());
    }
}
