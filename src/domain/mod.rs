//! 领域模型

pub mod auction;
pub mod network;
pub mod token;
pub mod transaction;

pub use auction::Auction;
pub use network::{NetworkConfig, NetworkRegistry};
pub use token::{Session, Token, UserProfile};
pub use transaction::{TrackedTransaction, TransactionLog, TxKind, TxStatus};
