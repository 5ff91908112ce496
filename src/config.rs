//! Dapp configuration: network endpoints, routes and session timings

use crate::constants::{HEARTBEAT_INTERVAL, NONCE_WATERMARK_TTL, WATCHDOG_TIMEOUT};
use std::time::Duration;

const DEFAULT_API_ADDRESS: &str = "https://api.elrond.com";
const DEFAULT_WALLET_ADDRESS: &str = "https://wallet.elrond.com";

/// Configuration shared by the refresher, orchestrator and session keeper
#[derive(Debug, Clone)]
pub struct DappConfig {
    /// Network API base URL (`/accounts/{address}`)
    pub api_address: String,
    /// Hosted web wallet base URL used for redirect signing
    pub wallet_address: String,
    /// Route to land on after a fresh login
    pub callback_route: String,
    /// Route to land on after logout
    pub logout_route: String,
    /// Liveness probe period
    pub heartbeat_interval: Duration,
    /// Max silence between connector heartbeat acknowledgements
    pub watchdog_timeout: Duration,
    /// Lifetime of a persisted nonce watermark
    pub nonce_watermark_ttl: Duration,
    /// Browser user agent, used to skip heartbeats where the transport is unreliable
    pub user_agent: Option<String>,
}

impl Default for DappConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DappConfig {
    /// Mainnet endpoints with default routes and timings
    pub fn new() -> Self {
        Self {
            api_address: DEFAULT_API_ADDRESS.to_string(),
            wallet_address: DEFAULT_WALLET_ADDRESS.to_string(),
            callback_route: "/dashboard".to_string(),
            logout_route: "/".to_string(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
            watchdog_timeout: WATCHDOG_TIMEOUT,
            nonce_watermark_ttl: NONCE_WATERMARK_TTL,
            user_agent: None,
        }
    }

    /// Build from `DAPP_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(api) = std::env::var("DAPP_API_ADDRESS") {
            config.api_address = api;
        }
        if let Ok(wallet) = std::env::var("DAPP_WALLET_ADDRESS") {
            config.wallet_address = wallet;
        }
        if let Ok(route) = std::env::var("DAPP_CALLBACK_ROUTE") {
            config.callback_route = route;
        }
        if let Ok(route) = std::env::var("DAPP_LOGOUT_ROUTE") {
            config.logout_route = route;
        }
        config
    }

    /// Set the network API address
    pub fn with_api_address(mut self, api_address: impl Into<String>) -> Self {
        self.api_address = api_address.into();
        self
    }

    /// Set the hosted wallet address
    pub fn with_wallet_address(mut self, wallet_address: impl Into<String>) -> Self {
        self.wallet_address = wallet_address.into();
        self
    }

    /// Set the login callback route
    pub fn with_callback_route(mut self, route: impl Into<String>) -> Self {
        self.callback_route = route.into();
        self
    }

    /// Set the logout route
    pub fn with_logout_route(mut self, route: impl Into<String>) -> Self {
        self.logout_route = route.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout = timeout;
        self
    }

    pub fn with_nonce_watermark_ttl(mut self, ttl: Duration) -> Self {
        self.nonce_watermark_ttl = ttl;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Whether the bridge transport is known to drop heartbeats here
    /// (iOS Safari; Chrome on iOS is fine).
    pub fn heartbeat_unreliable(&self) -> bool {
        self.user_agent.as_deref().is_some_and(is_ios_safari)
    }
}

fn is_ios_safari(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    let ios = ua.contains("ipad") || ua.contains("iphone");
    ios && ua.contains("webkit") && !ua.contains("crios")
}
