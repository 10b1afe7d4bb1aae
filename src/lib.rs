//! ZooCore - Zoo NFT 市场链上状态同步核心
//!
//! 客户端状态层：钱包连接、合约绑定、所有权解析、挂单同步、拍卖行SDK

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod service;

// 重新导出常用类型
pub use error::{MarketError, MarketErrorCode};
pub use service::market_store::{MarketSnapshot, MarketStore};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            auction::Auction,
            network::NetworkRegistry,
            token::{Session, Token, UserProfile},
            transaction::{TrackedTransaction, TxKind, TxStatus},
        },
        error::{MarketError, MarketErrorCode},
        infrastructure::wallet::{WalletConnector, WalletProvider},
        service::{
            auction_house::AuctionHouseClient, market_store::MarketStore,
            ownership::OwnershipResolver, registry_client::RegistryClient,
        },
    };
}
