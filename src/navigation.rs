//! Routing and location access
//!
//! The host application owns the router; the SDK only reads the current
//! location and asks for route changes through [`Navigator`].

use reqwest::Url;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Host router and location
pub trait Navigator: Send + Sync + fmt::Debug {
    /// Current query string (leading `?` optional)
    fn search(&self) -> String;

    /// Scheme + host of the running app, without trailing slash
    fn origin(&self) -> String;

    /// In-app route change
    fn push(&self, route: &str);

    /// Leave the app for an external URL
    fn redirect(&self, url: &str);

    /// Absolute URL for an in-app route
    fn absolute_url(&self, route: &str) -> String {
        format!("{}{}", self.origin().trim_end_matches('/'), route)
    }
}

/// Read one parameter from a query string
pub fn query_param(search: &str, name: &str) -> Option<String> {
    let search = search.trim_start_matches('?');
    let url = Url::parse(&format!("http://localhost/?{}", search)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// A navigation the SDK requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEntry {
    Push(String),
    Redirect(String),
}

/// In-memory navigator that records every request; suits headless hosts
#[derive(Debug)]
pub struct HistoryNavigator {
    origin: String,
    search: Mutex<String>,
    history: Mutex<Vec<NavigationEntry>>,
}

impl HistoryNavigator {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            search: Mutex::new(String::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search(self, search: impl Into<String>) -> Self {
        self.set_search(search);
        self
    }

    pub fn set_search(&self, search: impl Into<String>) {
        *self.search.lock().unwrap_or_else(PoisonError::into_inner) = search.into();
    }

    pub fn history(&self) -> Vec<NavigationEntry> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, entry: NavigationEntry) {
        tracing::debug!(?entry, "navigate");
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl Navigator for HistoryNavigator {
    fn search(&self) -> String {
        self.search
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn push(&self, route: &str) {
        self.record(NavigationEntry::Push(route.to_string()));
    }

    fn redirect(&self, url: &str) {
        self.record(NavigationEntry::Redirect(url.to_string()));
    }
}
