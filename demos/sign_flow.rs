//! Wallet-redirect signing flow against a live network API
//!
//! Run with: cargo run --example sign_flow
//!
//! Requires DAPP_ADDRESS (sender) and DAPP_RECEIVER environment variables

use std::sync::Arc;

use dapp_signing_sdk::{
    login, AccountRefresher, Action, ApiClient, AppState, DappConfig, HistoryNavigator,
    LoginMethod, Orchestrator, Storage, SubmitOutcome, Transaction, TransactionBatch,
    WalletProvider,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let address = std::env::var("DAPP_ADDRESS").expect("DAPP_ADDRESS must be set");
    let receiver = std::env::var("DAPP_RECEIVER").expect("DAPP_RECEIVER must be set");

    let config = DappConfig::from_env();
    let state = AppState::new();
    let storage = Storage::in_memory();
    let navigator = Arc::new(HistoryNavigator::new("http://localhost:3000"));
    let network = Arc::new(ApiClient::new(&config.api_address)?);

    state.dispatch(Action::SetProvider(Arc::new(WalletProvider::new(
        &config.wallet_address,
    ))));
    login(&state, &storage, &address, LoginMethod::Wallet);

    let refresher = AccountRefresher::new(state.clone(), network, storage.clone(), navigator.clone());
    if let Some(account) = refresher.refresh().await? {
        println!("Account {} balance {} nonce {}", account.address, account.balance, account.nonce);
    }

    let orchestrator = Orchestrator::new(
        state.clone(),
        refresher,
        storage,
        navigator.clone(),
        config.clone(),
    );

    let batch = TransactionBatch::new(
        vec![
            Transaction::new(&receiver, "1000000000000000").with_sender(&address),
            Transaction::new(&receiver, "2000000000000000").with_sender(&address),
        ],
        config.callback_route.clone(),
    );

    match orchestrator.submit(batch).await {
        SubmitOutcome::Redirected(url) => println!("Open in browser to sign:\n{}", url),
        other => println!("Signing did not redirect: {:?}", other),
    }
    println!("Local nonce is now {}", state.read(|s| s.account.nonce));

    Ok(())
}
