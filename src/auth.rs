//! Shared login and logout routines

use crate::constants::{LOGIN_METHOD_KEY, NONCE_KEY, TOKEN_LOGIN_KEY, WALLET_LOGIN_KEY};
use crate::navigation::Navigator;
use crate::state::{Action, AppState};
use crate::storage::Storage;
use crate::types::LoginMethod;
use serde_json::json;

/// Persist the login method and publish the login
pub fn login(state: &AppState, storage: &Storage, address: impl Into<String>, method: LoginMethod) {
    let address = address.into();
    storage.local.set(LOGIN_METHOD_KEY, json!(method.as_str()));
    tracing::info!("Logged in {} via {}", address, method.as_str());
    state.dispatch(Action::Login {
        address,
        login_method: method,
    });
}

/// The persisted login method, if a login survived the last reload
pub fn stored_login_method(storage: &Storage) -> Option<LoginMethod> {
    storage
        .local
        .get(LOGIN_METHOD_KEY)
        .and_then(|value| serde_json::from_value(value).ok())
}

/// End the session: provider logout, clear login storage, publish the
/// logout and leave for `callback_url`.
pub async fn logout(
    state: &AppState,
    storage: &Storage,
    navigator: &dyn Navigator,
    callback_url: &str,
) {
    if let Some(provider) = state.provider() {
        if let Err(e) = provider.logout().await {
            tracing::warn!("Provider logout failed: {:#}", e);
        }
    }

    storage.local.remove_item(LOGIN_METHOD_KEY);
    storage.local.remove_item(NONCE_KEY);
    storage.session.remove_item(WALLET_LOGIN_KEY);
    storage.session.remove_item(TOKEN_LOGIN_KEY);

    state.dispatch(Action::Logout);
    tracing::info!("Logged out, redirecting to {}", callback_url);
    navigator.redirect(callback_url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{HistoryNavigator, NavigationEntry};
    use crate::test_utils::{MockProvider, ALICE};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_logout_round_trip() {
        let state = AppState::new();
        state.dispatch(Action::SetProvider(Arc::new(MockProvider::ledger())));
        let storage = Storage::in_memory();
        let navigator = HistoryNavigator::new("https://dapp.example.com");

        login(&state, &storage, ALICE, LoginMethod::Ledger);
        assert_eq!(stored_login_method(&storage), Some(LoginMethod::Ledger));
        assert!(state.read(|s| s.logged_in));

        storage.session.set(TOKEN_LOGIN_KEY, json!({"loginToken": "abc"}));
        logout(&state, &storage, &navigator, "https://dapp.example.com/").await;

        assert_eq!(stored_login_method(&storage), None);
        assert_eq!(storage.session.get(TOKEN_LOGIN_KEY), None);
        assert!(!state.read(|s| s.logged_in));
        assert_eq!(
            navigator.history(),
            vec![NavigationEntry::Redirect("https://dapp.example.com/".into())]
        );
    }
}
