//! Process-wide session store
//!
//! One [`Session`] snapshot lives behind a `tokio::sync::watch` channel.
//! Components never write fields directly: they send an [`Action`] through
//! [`AppState::dispatch`], which applies it in a single `send_modify` so
//! readers always observe a complete account record.

use crate::provider::ProviderHandle;
use crate::types::{Account, LoginMethod, SendStatus, TokenLogin, WalletConnectLogin};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared login/account/signing state
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Active signing provider, if any
    pub provider: Option<ProviderHandle>,
    /// Bumped on every provider replacement
    pub provider_generation: u64,
    pub address: String,
    pub logged_in: bool,
    pub login_method: Option<LoginMethod>,
    pub account: Account,
    pub account_loading: bool,
    pub account_error: Option<String>,
    pub shard: Option<u32>,
    pub token_login: Option<TokenLogin>,
    pub wallet_connect_login: Option<WalletConnectLogin>,
    /// Signing-in-progress indicator
    pub send_status: SendStatus,
    /// Unix seconds of the last connector heartbeat acknowledgement
    pub last_heartbeat_at: Option<u64>,
}

/// Transition messages accepted by the store
#[derive(Debug, Clone)]
pub enum Action {
    SetProvider(ProviderHandle),
    Login {
        address: String,
        login_method: LoginMethod,
    },
    Logout,
    SetAccount(Account),
    /// Successful refresh: publish the account, clear loading and error
    AccountRefreshed(Account),
    /// Failed refresh: clear loading, keep the previous account
    AccountRefreshFailed(String),
    SetAccountLoading(bool),
    SetAccountShard(u32),
    SetTokenLogin(TokenLogin),
    SetWalletConnectLogin(WalletConnectLogin),
    UpdateSendStatus(SendStatus),
    HeartbeatAcknowledged(u64),
}

impl Session {
    /// Apply one transition
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetProvider(provider) => {
                self.provider = Some(provider);
                self.provider_generation += 1;
            }
            Action::Login {
                address,
                login_method,
            } => {
                self.address = address;
                self.logged_in = true;
                self.login_method = Some(login_method);
            }
            Action::Logout => {
                *self = Session {
                    provider: self.provider.take(),
                    provider_generation: self.provider_generation,
                    ..Session::default()
                };
            }
            Action::SetAccount(account) => {
                self.account = account;
            }
            Action::AccountRefreshed(account) => {
                self.account = account;
                self.account_loading = false;
                self.account_error = None;
            }
            Action::AccountRefreshFailed(error) => {
                self.account_loading = false;
                self.account_error = Some(error);
            }
            Action::SetAccountLoading(loading) => {
                self.account_loading = loading;
            }
            Action::SetAccountShard(shard) => {
                self.shard = Some(shard);
            }
            Action::SetTokenLogin(token_login) => {
                self.token_login = Some(token_login);
            }
            Action::SetWalletConnectLogin(login) => {
                self.wallet_connect_login = Some(login);
            }
            Action::UpdateSendStatus(status) => {
                self.send_status = status;
            }
            Action::HeartbeatAcknowledged(at) => {
                self.last_heartbeat_at = Some(at);
            }
        }
    }
}

/// Cloneable handle to the session store
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<watch::Sender<Session>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_session(Session::default())
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Apply a transition atomically and notify subscribers
    pub fn dispatch(&self, action: Action) {
        tracing::trace!(?action, "dispatch");
        self.inner.send_modify(|session| session.apply(action));
    }

    /// Clone of the current snapshot
    pub fn snapshot(&self) -> Session {
        self.inner.borrow().clone()
    }

    /// Read a projection without cloning the whole snapshot
    pub fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.inner.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.subscribe()
    }

    pub fn provider(&self) -> Option<ProviderHandle> {
        self.read(|s| s.provider.clone())
    }
}
