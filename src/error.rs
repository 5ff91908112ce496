//! Error types for the dapp signing SDK
//!
//! Uses `eyre` for ergonomic error handling with context. Failures that the
//! signing flow reacts to (rather than just propagates) are classified by
//! [`SigningError`].

pub use eyre::{eyre, Context, Report, Result};

use crate::constants::NO_SIGNER_MESSAGE;
use thiserror::Error;

/// Classified signing-flow failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// No active signer is configured
    #[error("{}", NO_SIGNER_MESSAGE)]
    NoSigner,

    /// The submitted batch contains no transactions
    #[error("No transactions to sign")]
    EmptyBatch,

    /// Address resolution or account fetch failed
    #[error("{0}")]
    Network(String),

    /// Remote signer session dropped (heartbeat, watchdog, or another context)
    #[error("Session lost: {0}")]
    SessionLost(String),

    /// Address did not pass format validation
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The active provider variant does not support this call
    #[error("Provider does not support {0}")]
    Unsupported(&'static str),

    /// A newer submit or a close overtook this request
    #[error("Signing request superseded")]
    Superseded,
}

impl SigningError {
    /// Whether this failure produces user-visible modal text
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            SigningError::NoSigner
                | SigningError::EmptyBatch
                | SigningError::Network(_)
                | SigningError::InvalidAddress(_)
        )
    }

    /// Collapse an arbitrary collaborator error into a network failure,
    /// keeping an already-classified error intact.
    pub fn from_report(report: &Report) -> Self {
        match report.downcast_ref::<SigningError>() {
            Some(err) => err.clone(),
            None => SigningError::Network(format!("{:#}", report)),
        }
    }
}
