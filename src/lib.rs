//! Dapp signing SDK for Rust
//!
//! Coordinates transaction signing for a dapp across several signing
//! backends: hosted wallet redirect, hardware ledger, browser extension and
//! a relay-bridged mobile wallet.
//!
//! # Features
//!
//! - Shared login/account session store with atomic transitions
//! - Account refresh with a local nonce watermark against stale remote nonces
//! - Signing orchestration with sequential nonce assignment per batch
//! - Bridged session keep-alive (heartbeat, watchdog, cross-context logout)
//!
//! # Example
//!
//! ```rust,ignore
//! use dapp_signing_sdk::{
//!     AccountRefresher, Action, ApiClient, AppState, DappConfig, HistoryNavigator,
//!     Orchestrator, Storage, Transaction, TransactionBatch, WalletProvider,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = DappConfig::from_env();
//!     let state = AppState::new();
//!     let storage = Storage::in_memory();
//!     let navigator = Arc::new(HistoryNavigator::new("https://dapp.example.com"));
//!     let network = Arc::new(ApiClient::new(&config.api_address)?);
//!
//!     state.dispatch(Action::SetProvider(Arc::new(WalletProvider::new(&config.wallet_address))));
//!     let refresher = AccountRefresher::new(state.clone(), network, storage.clone(), navigator.clone());
//!     let orchestrator = Orchestrator::new(state, refresher, storage, navigator, config);
//!
//!     // Assigns nonces and redirects to the hosted wallet
//!     let batch = TransactionBatch::new(vec![Transaction::new("erd1...", "1000")], "/dashboard");
//!     let outcome = orchestrator.submit(batch).await;
//!     println!("{:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod navigation;
pub mod network;
pub mod nonce;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export main types for convenience
pub use account::AccountRefresher;
pub use auth::{login, logout};
pub use config::DappConfig;
pub use error::{eyre, Context, Report, Result, SigningError};
pub use navigation::{HistoryNavigator, Navigator};
pub use network::{ApiClient, NetworkProvider};
pub use nonce::{latest_nonce, set_nonce};
pub use orchestrator::{CloseOptions, Orchestrator, SigningPhase, SigningUiState, SubmitOutcome};
pub use provider::{
    classify, BridgeConnector, Capabilities, ConnectorEvent, DappProvider, ProviderHandle,
    ProviderVariant, WalletConnectProvider, WalletProvider,
};
pub use session::SessionKeeper;
pub use state::{Action, AppState, Session};
pub use storage::{KeyValueStore, MemoryStore, Storage};
pub use types::{
    Account, AccountOnNetwork, LoginMethod, SendStatus, TokenLogin, Transaction,
    TransactionBatch, TxStatus, WalletConnectLogin,
};
