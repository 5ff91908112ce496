//! Account and login types

use serde::{Deserialize, Serialize};

/// Account state as returned by the network API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountOnNetwork {
    #[serde(default)]
    pub address: String,
    /// Balance in the smallest denomination, as a decimal string
    pub balance: String,
    pub nonce: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub shard: Option<u32>,
}

/// Account snapshot published to session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    /// Decimal string, never parsed here
    pub balance: String,
    pub nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl Account {
    /// Build a snapshot from a network read, with an already-merged nonce
    pub fn from_network(address: impl Into<String>, remote: &AccountOnNetwork, nonce: u64) -> Self {
        Self {
            address: address.into(),
            balance: remote.balance.clone(),
            nonce,
            user_name: (!remote.username.is_empty()).then(|| remote.username.clone()),
        }
    }
}

/// How the current user logged in; persisted under `loginMethod`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Wallet,
    Ledger,
    Extension,
    WalletConnect,
}

impl LoginMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginMethod::Wallet => "wallet",
            LoginMethod::Ledger => "ledger",
            LoginMethod::Extension => "extension",
            LoginMethod::WalletConnect => "walletconnect",
        }
    }
}

/// Login token plus the signature the remote signer produced over it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenLogin {
    #[serde(default)]
    pub login_token: String,
    #[serde(default)]
    pub signature: String,
}

/// Record published when a bridged session logs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnectLogin {
    pub login_type: LoginMethod,
    pub callback_route: String,
    pub logout_route: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_on_network_from_api_json() {
        let json = r#"{
            "address": "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th",
            "balance": "1000000000000000000",
            "nonce": 5,
            "shard": 1
        }"#;
        let account: AccountOnNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(account.nonce, 5);
        assert_eq!(account.shard, Some(1));
        assert!(account.username.is_empty());
    }

    #[test]
    fn test_empty_username_is_dropped() {
        let remote = AccountOnNetwork {
            address: String::new(),
            balance: "10".into(),
            nonce: 1,
            username: String::new(),
            shard: None,
        };
        let account = Account::from_network("erd1x", &remote, 3);
        assert_eq!(account.user_name, None);
        assert_eq!(account.nonce, 3);

        let named = AccountOnNetwork {
            username: "alice.elrond".into(),
            ..remote
        };
        let account = Account::from_network("erd1x", &named, 3);
        assert_eq!(account.user_name.as_deref(), Some("alice.elrond"));
    }

    #[test]
    fn test_login_method_serde() {
        assert_eq!(
            serde_json::to_string(&LoginMethod::WalletConnect).unwrap(),
            "\"walletconnect\""
        );
        let method: LoginMethod = serde_json::from_str("\"extension\"").unwrap();
        assert_eq!(method, LoginMethod::Extension);
    }
}
