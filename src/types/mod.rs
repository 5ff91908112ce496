//! Domain types for accounts, transactions and login state

pub mod account;
pub mod transaction;

pub use account::{Account, AccountOnNetwork, LoginMethod, TokenLogin, WalletConnectLogin};
pub use transaction::{SendStatus, Transaction, TransactionBatch, TxStatus};
