//! Transaction signing orchestrator
//!
//! Receives a batch plus callback route, fetches the account for the address
//! in session state, assigns nonces, classifies the active provider and
//! routes the batch:
//!
//! ```text
//!   Idle ──submit──► Resolving ──► Dispatching ──┬──► RedirectedExternally
//!    ▲                   │                        └──► AwaitingConfirm ──confirm──┐
//!    │                   └──► Failed                          │                   │
//!    └────────────────────────── close ◄──────────────────────┴───────────────────┘
//! ```
//!
//! Every submit takes a call token. A fetch that settles after a newer
//! submit (or a close) started is discarded before any nonce is assigned.

use crate::account::AccountRefresher;
use crate::config::DappConfig;
use crate::error::SigningError;
use crate::navigation::Navigator;
use crate::nonce::{assign_sequential, latest_nonce, set_nonce};
use crate::provider::{classify, ProviderVariant, WalletProvider};
use crate::state::{Action, AppState};
use crate::storage::Storage;
use crate::types::{SendStatus, Transaction, TransactionBatch};
use eyre::{ensure, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Request channel depth for [`Orchestrator::spawn`]
const REQUEST_BUFFER: usize = 16;

/// Where the current signing flow stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningPhase {
    #[default]
    Idle,
    Resolving,
    Dispatching,
    /// Nonced batch waits for in-app confirmation (ledger, extension, bridged)
    AwaitingConfirm,
    /// Control handed to the hosted wallet
    RedirectedExternally,
    /// Precondition or network failure shown to the user
    Failed,
}

/// Props for the signing modal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SigningUiState {
    pub visible: bool,
    pub phase: SigningPhase,
    pub transactions: Vec<Transaction>,
    pub error: Option<String>,
    pub provider_variant: Option<ProviderVariant>,
    pub callback_route: String,
}

/// Options for [`Orchestrator::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOptions {
    /// Also mark the signing flow as cancelled
    pub update_batch_status: bool,
}

/// Result of one [`Orchestrator::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Batch handed to the hosted wallet at this URL
    Redirected(String),
    /// Batch waits for [`Orchestrator::confirm`] or [`Orchestrator::close`]
    AwaitingConfirm,
    /// Flow ended with a user-visible error
    Failed(SigningError),
    /// A newer submit or a close overtook this one
    Superseded,
}

/// Top-level signing state machine
#[derive(Debug)]
pub struct Orchestrator {
    state: AppState,
    refresher: AccountRefresher,
    storage: Storage,
    navigator: Arc<dyn Navigator>,
    config: DappConfig,
    ui: watch::Sender<SigningUiState>,
    call_token: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        state: AppState,
        refresher: AccountRefresher,
        storage: Storage,
        navigator: Arc<dyn Navigator>,
        config: DappConfig,
    ) -> Self {
        let (ui, _) = watch::channel(SigningUiState::default());
        Self {
            state,
            refresher,
            storage,
            navigator,
            config,
            ui,
            call_token: AtomicU64::new(0),
        }
    }

    /// Current modal props
    pub fn ui_state(&self) -> SigningUiState {
        self.ui.borrow().clone()
    }

    pub fn subscribe_ui(&self) -> watch::Receiver<SigningUiState> {
        self.ui.subscribe()
    }

    fn update_ui(&self, f: impl FnOnce(&mut SigningUiState)) {
        self.ui.send_modify(f);
    }

    fn is_current(&self, token: u64) -> bool {
        self.call_token.load(Ordering::Acquire) == token
    }

    /// Start a signing flow for `batch`
    pub async fn submit(&self, batch: TransactionBatch) -> SubmitOutcome {
        let token = self.call_token.fetch_add(1, Ordering::AcqRel) + 1;
        let TransactionBatch {
            mut transactions,
            callback_route,
        } = batch;

        tracing::info!(
            "Signing request #{} for {} transaction(s)",
            token,
            transactions.len()
        );
        self.update_ui(|ui| {
            *ui = SigningUiState {
                phase: SigningPhase::Resolving,
                callback_route: callback_route.clone(),
                ..Default::default()
            };
        });
        self.state
            .dispatch(Action::UpdateSendStatus(SendStatus::loading()));

        let Some(provider) = self.state.provider() else {
            return self.fail(SigningError::NoSigner);
        };
        if transactions.is_empty() {
            return self.fail(SigningError::EmptyBatch);
        }

        let (address, login_method, generation) = self
            .state
            .read(|s| (s.address.clone(), s.login_method, s.provider_generation));
        if address.is_empty() {
            return self.fail(SigningError::Network(
                "No address available for signing".to_string(),
            ));
        }

        let account = match self.refresher.get_account(&address).await {
            Ok(account) => account,
            Err(e) => return self.fail(SigningError::from_report(&e)),
        };

        if !self.is_current(token) {
            tracing::debug!("Signing request #{} superseded, dropping account", token);
            return SubmitOutcome::Superseded;
        }
        let unchanged = self
            .state
            .read(|s| s.address == address && s.provider_generation == generation);
        if !unchanged {
            return self.fail(SigningError::Network(
                "Account changed while preparing transactions".to_string(),
            ));
        }

        let base = latest_nonce(self.storage.local.as_ref(), account.nonce);
        assign_sequential(&mut transactions, base);
        let variant = classify(provider.as_ref(), login_method);
        tracing::debug!(
            "Request #{}: nonces {}..{} via {:?}",
            token,
            base,
            base + transactions.len() as u64,
            variant
        );

        self.update_ui(|ui| {
            ui.phase = SigningPhase::Dispatching;
            ui.provider_variant = Some(variant);
        });

        // nothing is persisted until the route is known to work
        let redirect_url = if variant.signs_in_place() {
            None
        } else {
            let wallet = WalletProvider::new(&self.config.wallet_address);
            let callback_url = self.navigator.absolute_url(&callback_route);
            match wallet.sign_transactions_url(&transactions, &callback_url) {
                Ok(url) => Some(url),
                Err(e) => return self.fail(SigningError::from_report(&e)),
            }
        };

        set_nonce(
            &self.state,
            &self.storage,
            base + transactions.len() as u64,
            self.config.nonce_watermark_ttl,
        );

        match redirect_url {
            Some(url) => {
                self.update_ui(|ui| {
                    ui.phase = SigningPhase::RedirectedExternally;
                    ui.visible = false;
                });
                tracing::info!("Redirecting to wallet for signing");
                self.navigator.redirect(url.as_str());
                SubmitOutcome::Redirected(url.to_string())
            }
            None => {
                self.update_ui(|ui| {
                    ui.phase = SigningPhase::AwaitingConfirm;
                    ui.visible = true;
                    ui.transactions = transactions;
                    ui.error = None;
                });
                SubmitOutcome::AwaitingConfirm
            }
        }
    }

    fn fail(&self, error: SigningError) -> SubmitOutcome {
        tracing::error!("Signing flow failed: {}", error);
        self.state
            .dispatch(Action::UpdateSendStatus(SendStatus::cancelled()));
        // session-level failures end in logout, not in the modal
        let message = error.is_user_visible().then(|| error.to_string());
        self.update_ui(|ui| {
            ui.phase = SigningPhase::Failed;
            ui.visible = message.is_some();
            ui.transactions.clear();
            ui.error = message;
        });
        SubmitOutcome::Failed(error)
    }

    /// Sign the pending batch with the active provider, in order.
    ///
    /// On success the flow is marked completed and the modal closed without
    /// re-marking it cancelled. A signer error stays on the modal.
    pub async fn confirm(&self) -> Result<Vec<Transaction>> {
        let token = self.call_token.load(Ordering::Acquire);
        let pending = self.ui_state();
        ensure!(
            pending.phase == SigningPhase::AwaitingConfirm && !pending.transactions.is_empty(),
            "No transactions awaiting confirmation"
        );
        let provider = self.state.provider().ok_or(SigningError::NoSigner)?;

        let mut signed = Vec::with_capacity(pending.transactions.len());
        for tx in &pending.transactions {
            match provider.sign_transaction(tx).await {
                Ok(tx) => signed.push(tx),
                Err(e) => {
                    tracing::warn!("Signing nonce {} failed: {:#}", tx.nonce, e);
                    let message = format!("{:#}", e);
                    self.update_ui(|ui| ui.error = Some(message));
                    return Err(e);
                }
            }
        }

        if !self.is_current(token) {
            return Err(SigningError::Superseded.into());
        }

        tracing::info!("Signed {} transaction(s)", signed.len());
        self.state
            .dispatch(Action::UpdateSendStatus(SendStatus::completed()));
        self.close(CloseOptions {
            update_batch_status: false,
        });
        Ok(signed)
    }

    /// Clear pending state and hide the modal; any in-flight submit is dropped
    pub fn close(&self, options: CloseOptions) {
        self.call_token.fetch_add(1, Ordering::AcqRel);
        self.update_ui(|ui| *ui = SigningUiState::default());
        if options.update_batch_status {
            self.state
                .dispatch(Action::UpdateSendStatus(SendStatus::cancelled()));
        }
    }

    /// Serve signing requests from a channel, one at a time
    pub async fn run(self: Arc<Self>, mut requests: mpsc::Receiver<TransactionBatch>) {
        while let Some(batch) = requests.recv().await {
            let outcome = self.submit(batch).await;
            tracing::debug!(?outcome, "Signing request handled");
        }
        tracing::debug!("Signing request channel closed");
    }

    /// Spawn [`Orchestrator::run`] and hand back the request sender
    pub fn spawn(self: Arc<Self>) -> (mpsc::Sender<TransactionBatch>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }
}
