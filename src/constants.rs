//! Storage keys, timing defaults and fixed messages

use std::time::Duration;

/// Local storage: how the user logged in
pub const LOGIN_METHOD_KEY: &str = "loginMethod";

/// Local storage: nonce watermark (expiring)
pub const NONCE_KEY: &str = "nonce";

/// Session storage: set while a hosted-wallet login round trip is in progress
pub const WALLET_LOGIN_KEY: &str = "walletLogin";

/// Session storage: `{ loginToken }` fragment used to build the token login
pub const TOKEN_LOGIN_KEY: &str = "tokenLogin";

/// Local storage: the bridge connector's own "connected" record
pub const WALLETCONNECT_KEY: &str = "walletconnect";

/// Primary liveness probe period for bridged sessions
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Secondary watchdog: max gap between heartbeat acknowledgements
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(150);

/// How long a persisted nonce watermark stays valid
pub const NONCE_WATERMARK_TTL: Duration = Duration::from_secs(60 * 60);

/// Custom message kind used for the liveness probe
pub const HEARTBEAT_METHOD: &str = "heartbeat";

/// Shown when a signing flow is requested without an active provider
pub const NO_SIGNER_MESSAGE: &str = "You need a singer/valid signer to send a transaction, use either WalletProvider, LedgerProvider or WalletConnect";

/// Shown when a bridged login does not yield an address
pub const INVALID_ADDRESS_MESSAGE: &str = "Invalid address";

/// Human-readable part of account addresses
pub const ADDRESS_HRP: &str = "erd";

/// Raw public key length behind an address
pub const ADDRESS_PAYLOAD_LEN: usize = 32;

/// Check that `address` is a well-formed bech32 account address
pub fn address_is_valid(address: &str) -> bool {
    match bech32::decode(address) {
        Ok((hrp, payload)) => {
            hrp.as_str() == ADDRESS_HRP && payload.len() == ADDRESS_PAYLOAD_LEN
        }
        Err(_) => false,
    }
}
