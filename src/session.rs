//! Bridged-wallet session keeper
//!
//! Keeps a relay session to a remote signer alive and notices when it is
//! gone. Three independent pieces of periodic work belong to a session and
//! are torn down together:
//!
//! - the heartbeat probe: every `heartbeat_interval` a custom message goes to
//!   the remote signer; a failed send forces logout
//! - the watchdog: armed on login and re-armed by every heartbeat
//!   acknowledgement from the connector; firing forces logout
//! - the connector event listener (login, logout, acknowledgements)
//!
//! When the provider is replaced while its session is still connected, a
//! storage listener is left behind so a disconnect from another browsing
//! context still logs this one out.

use crate::auth::{login, logout, stored_login_method};
use crate::config::DappConfig;
use crate::constants::{INVALID_ADDRESS_MESSAGE, TOKEN_LOGIN_KEY, WALLETCONNECT_KEY};
use crate::error::SigningError;
use crate::navigation::Navigator;
use crate::provider::{BridgeConnector, ConnectorEvent, ProviderHandle, WalletConnectProvider};
use crate::state::{Action, AppState};
use crate::storage::{unix_now, Storage};
use crate::types::{LoginMethod, TokenLogin, WalletConnectLogin};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Tasks owned by the current session
#[derive(Debug, Default)]
struct SessionTasks {
    heartbeat: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
    events: Option<JoinHandle<()>>,
    storage_listener: Option<JoinHandle<()>>,
}

impl SessionTasks {
    /// Stop the current session's periodic work; the cross-context
    /// listener outlives provider swaps.
    fn abort_session(&mut self) {
        for handle in [self.heartbeat.take(), self.watchdog.take(), self.events.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        self.abort_session();
        if let Some(handle) = self.storage_listener.take() {
            handle.abort();
        }
    }

    fn listening_for_disconnect(&self) -> bool {
        self.storage_listener
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Whether a stored connector record still marks the relay session connected
fn marks_connected(record: Option<&Value>) -> bool {
    record
        .and_then(|value| value.get("connected"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Maintains the bridged signer session for whatever provider is active
#[derive(Debug)]
pub struct SessionKeeper {
    state: AppState,
    storage: Storage,
    navigator: Arc<dyn Navigator>,
    config: DappConfig,
    provider: Mutex<Option<ProviderHandle>>,
    tasks: Mutex<SessionTasks>,
    logged_out: AtomicBool,
    error: Mutex<Option<String>>,
}

impl SessionKeeper {
    pub fn new(
        state: AppState,
        storage: Storage,
        navigator: Arc<dyn Navigator>,
        config: DappConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            storage,
            navigator,
            config,
            provider: Mutex::new(None),
            tasks: Mutex::new(SessionTasks::default()),
            logged_out: AtomicBool::new(false),
            error: Mutex::new(None),
        })
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, SessionTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_provider(&self) -> Option<ProviderHandle> {
        self.provider
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Last login error shown to the user
    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_error(&self, error: Option<String>) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    pub fn heartbeat_running(&self) -> bool {
        self.tasks().heartbeat.is_some()
    }

    pub fn watchdog_armed(&self) -> bool {
        self.tasks().watchdog.is_some()
    }

    /// Create a bridged provider over `connector` and make it the active one
    pub fn wallet_connect_init<C: BridgeConnector + 'static>(
        self: &Arc<Self>,
        connector: C,
    ) -> Arc<WalletConnectProvider<C>> {
        let provider = Arc::new(WalletConnectProvider::new(connector));
        self.state.dispatch(Action::SetProvider(provider.clone()));
        provider
    }

    /// Follow provider replacements in the session store
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let keeper = Arc::downgrade(self);
        let mut rx = self.state.subscribe();
        tokio::spawn(async move {
            let mut generation = None;
            loop {
                let current = {
                    let session = rx.borrow_and_update();
                    (session.provider_generation, session.provider.clone())
                };
                if generation != Some(current.0) {
                    generation = Some(current.0);
                    if let (Some(provider), Some(keeper)) = (current.1, keeper.upgrade()) {
                        keeper.attach(provider);
                    }
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Switch to `provider`: tear down the old session's work and start the
    /// heartbeat and event listener for the new one.
    pub fn attach(self: &Arc<Self>, provider: ProviderHandle) {
        self.detach();
        tracing::debug!("Session keeper attached to {:?}", provider.capabilities());
        *self.provider.lock().unwrap_or_else(PoisonError::into_inner) = Some(provider.clone());
        self.logged_out.store(false, Ordering::Release);

        if let Some(mut events) = provider.connector_events() {
            let keeper = Arc::downgrade(self);
            let handle = tokio::spawn(async move {
                loop {
                    let event = match events.recv().await {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Missed {} connector events", skipped);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    let Some(keeper) = keeper.upgrade() else { break };
                    keeper.handle_event(event).await;
                }
            });
            self.tasks().events = Some(handle);
        }

        self.start_heartbeat();
    }

    /// Stop the session's periodic work. If the outgoing provider is still
    /// connected, keep listening for a disconnect from another context.
    pub fn detach(self: &Arc<Self>) {
        let previous = self
            .provider
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut tasks = self.tasks();
        tasks.abort_session();

        if previous.is_some_and(|p| p.is_connected()) && !tasks.listening_for_disconnect() {
            tasks.storage_listener = Some(self.spawn_storage_listener());
        }
    }

    fn spawn_storage_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let keeper = Arc::downgrade(self);
        let mut changes = self.storage.local.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change)
                        if change.key == WALLETCONNECT_KEY
                            && !marks_connected(change.new_value.as_ref()) =>
                    {
                        if let Some(keeper) = keeper.upgrade() {
                            keeper
                                .handle_logout(SigningError::SessionLost(
                                    "disconnected in another context".into(),
                                ))
                                .await;
                        }
                        break;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn start_heartbeat(self: &Arc<Self>) {
        let Some(provider) = self.current_provider() else {
            return;
        };
        if !provider.capabilities().bridged_connector {
            return;
        }
        if self.config.heartbeat_unreliable() {
            tracing::debug!("Heartbeat disabled for this user agent");
            return;
        }

        let keeper = Arc::downgrade(self);
        let period = self.config.heartbeat_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !provider.is_connected() {
                    continue;
                }
                if let Err(e) = provider.send_heartbeat().await {
                    tracing::error!("Connection lost: {:#}", e);
                    if let Some(keeper) = keeper.upgrade() {
                        keeper
                            .handle_logout(SigningError::SessionLost(format!("{:#}", e)))
                            .await;
                    }
                    break;
                }
            }
        });

        if let Some(old) = self.tasks().heartbeat.replace(handle) {
            old.abort();
        }
    }

    fn arm_watchdog(self: &Arc<Self>) {
        let keeper: Weak<Self> = Arc::downgrade(self);
        let timeout = self.config.watchdog_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(keeper) = keeper.upgrade() {
                tracing::warn!("No heartbeat acknowledgement for {:?}", timeout);
                keeper
                    .handle_logout(SigningError::SessionLost("heartbeat watchdog expired".into()))
                    .await;
            }
        });

        if let Some(old) = self.tasks().watchdog.replace(handle) {
            old.abort();
        }
    }

    async fn handle_event(self: &Arc<Self>, event: ConnectorEvent) {
        match event {
            ConnectorEvent::Login => self.handle_login().await,
            ConnectorEvent::Logout => {
                self.handle_logout(SigningError::SessionLost("remote signer logged out".into()))
                    .await
            }
            ConnectorEvent::Heartbeat => {
                self.state
                    .dispatch(Action::HeartbeatAcknowledged(unix_now()));
                if self.watchdog_armed() {
                    self.arm_watchdog();
                }
            }
        }
    }

    /// Remote signer approved the session
    pub async fn handle_login(self: &Arc<Self>) {
        let Some(provider) = self.current_provider() else {
            return;
        };

        let address = match provider.get_address().await {
            Ok(address) if !address.is_empty() => address,
            Ok(_) => {
                tracing::warn!("Bridge login returned an empty address");
                self.set_error(Some(INVALID_ADDRESS_MESSAGE.to_string()));
                return;
            }
            Err(e) => {
                tracing::warn!("Bridge login failed: {:#}", e);
                self.set_error(Some(INVALID_ADDRESS_MESSAGE.to_string()));
                return;
            }
        };
        self.set_error(None);

        if stored_login_method(&self.storage).is_none() {
            self.navigator.push(&self.config.callback_route);
        }

        match provider.get_signature().await {
            Ok(Some(signature)) if !signature.is_empty() => {
                let login_token = self
                    .storage
                    .session
                    .get(TOKEN_LOGIN_KEY)
                    .and_then(|v| v.get("loginToken").and_then(|t| t.as_str()).map(str::to_string))
                    .unwrap_or_default();
                self.state.dispatch(Action::SetTokenLogin(TokenLogin {
                    login_token,
                    signature,
                }));
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("No login signature: {:#}", e),
        }

        self.state
            .dispatch(Action::SetWalletConnectLogin(WalletConnectLogin {
                login_type: LoginMethod::WalletConnect,
                callback_route: self.config.callback_route.clone(),
                logout_route: self.config.logout_route.clone(),
            }));
        login(&self.state, &self.storage, address, LoginMethod::WalletConnect);

        self.logged_out.store(false, Ordering::Release);
        self.arm_watchdog();
        if !self.heartbeat_running() {
            self.start_heartbeat();
        }
    }

    /// Force the session closed. Runs at most once per session.
    pub async fn handle_logout(self: &Arc<Self>, reason: SigningError) {
        if self.logged_out.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::warn!("{}", reason);

        let (heartbeat, watchdog, storage_listener) = {
            let mut tasks = self.tasks();
            (
                tasks.heartbeat.take(),
                tasks.watchdog.take(),
                tasks.storage_listener.take(),
            )
        };

        if stored_login_method(&self.storage).is_some() {
            self.navigator.push(&self.config.logout_route);
        }
        let callback_url = self.navigator.absolute_url(&self.config.logout_route);
        logout(&self.state, &self.storage, self.navigator.as_ref(), &callback_url).await;

        // may abort the calling task; nothing awaits after this
        for handle in [heartbeat, watchdog, storage_listener].into_iter().flatten() {
            handle.abort();
        }
    }
}

impl Drop for SessionKeeper {
    fn drop(&mut self) {
        self.tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}
