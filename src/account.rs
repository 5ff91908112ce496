//! Account refresh: address resolution, network fetch and nonce merge

use crate::constants::{address_is_valid, WALLET_LOGIN_KEY};
use crate::error::SigningError;
use crate::navigation::{query_param, Navigator};
use crate::network::NetworkProvider;
use crate::nonce::latest_nonce;
use crate::provider::{classify, ProviderVariant};
use crate::state::{Action, AppState};
use crate::storage::Storage;
use crate::types::{Account, AccountOnNetwork};
use eyre::{Context, Result};
use std::sync::Arc;

/// Resolves the active address and keeps the published account current
#[derive(Debug, Clone)]
pub struct AccountRefresher {
    state: AppState,
    network: Arc<dyn NetworkProvider>,
    storage: Storage,
    navigator: Arc<dyn Navigator>,
}

impl AccountRefresher {
    pub fn new(
        state: AppState,
        network: Arc<dyn NetworkProvider>,
        storage: Storage,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state,
            network,
            storage,
            navigator,
        }
    }

    /// Raw network read, bypassing the published snapshot
    pub async fn get_account(&self, address: &str) -> Result<AccountOnNetwork> {
        self.network
            .get_account(address)
            .await
            .with_context(|| format!("Failed to fetch account {}", address))
    }

    /// Resolve the active address with the strategy for the current provider
    ///
    /// - wallet redirect: `?address=` after a wallet login round trip, else the
    ///   known session address, else empty
    /// - extension / ledger already logged in: the known address
    /// - anything else: ask the provider
    pub async fn resolve_address(&self) -> Result<String> {
        let (provider, login_method, logged_in, address) = self.state.read(|s| {
            (
                s.provider.clone(),
                s.login_method,
                s.logged_in,
                s.address.clone(),
            )
        });
        let provider = provider.ok_or(SigningError::NoSigner)?;

        match classify(provider.as_ref(), login_method) {
            ProviderVariant::WalletRedirect => {
                if self.storage.session.get(WALLET_LOGIN_KEY).is_some() {
                    match query_param(&self.navigator.search(), "address") {
                        Some(candidate) if address_is_valid(&candidate) => return Ok(candidate),
                        Some(candidate) => {
                            tracing::debug!(
                                "{}",
                                SigningError::InvalidAddress(candidate)
                            );
                        }
                        None => {}
                    }
                }
                Ok(if logged_in { address } else { String::new() })
            }
            ProviderVariant::Extension | ProviderVariant::Ledger if logged_in => Ok(address),
            _ => provider.get_address().await,
        }
    }

    /// Refresh the published account.
    ///
    /// Initializes the provider first if needed; returns `Ok(None)` when it
    /// declines. On failure the error is published and the previous account
    /// is left untouched.
    pub async fn refresh(&self) -> Result<Option<Account>> {
        let provider = self.state.provider().ok_or(SigningError::NoSigner)?;

        if !provider.is_initialized() {
            let initialized = provider.init().await.map_err(|e| {
                tracing::error!("Failed initializing provider: {:#}", e);
                e.wrap_err("Failed initializing provider")
            })?;
            if !initialized {
                tracing::warn!("Provider declined to initialize, skipping refresh");
                return Ok(None);
            }
        }

        self.state.dispatch(Action::SetAccountLoading(true));

        match self.load_account().await {
            Ok(account) => {
                tracing::debug!("Account {} refreshed, nonce {}", account.address, account.nonce);
                self.state.dispatch(Action::AccountRefreshed(account.clone()));
                Ok(Some(account))
            }
            Err(e) => {
                tracing::error!("{:#}", e);
                self.state
                    .dispatch(Action::AccountRefreshFailed(format!("{:#}", e)));
                Err(e)
            }
        }
    }

    async fn load_account(&self) -> Result<Account> {
        let address = self
            .resolve_address()
            .await
            .context("Failed getting address")?;
        let remote = self
            .get_account(&address)
            .await
            .context("Failed getting account")?;
        let nonce = latest_nonce(self.storage.local.as_ref(), remote.nonce);
        Ok(Account::from_network(address, &remote, nonce))
    }

    /// Shard of the current account; cached after the first lookup.
    /// Lookup failures resolve to `None`.
    pub async fn get_account_shard(&self) -> Option<u32> {
        let (shard, address) = self.state.read(|s| (s.shard, s.address.clone()));
        if shard.is_some() {
            return shard;
        }

        match self.network.get_account_shard(&address).await {
            Ok(Some(shard)) => {
                self.state.dispatch(Action::SetAccountShard(shard));
                Some(shard)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed getting account shard: {:#}", e);
                None
            }
        }
    }
}
