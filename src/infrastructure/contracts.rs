//! 合约句柄模块
//!
//! 内置 ZooMedia / AuctionHouse 的 ABI（与链上部署的合约面一致），
//! 并以动态 `Contract` 封装类型化的读写面。核心层只消费
//! `MediaContract` / `ContractConnector` trait。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    abi::Abi,
    contract::Contract,
    providers::Middleware,
    types::{Address, Filter, H256, U256},
    utils::keccak256,
};
use once_cell::sync::Lazy;

use crate::{
    domain::token::TokenMeta,
    error::MarketError,
    infrastructure::wallet::ZooClient,
};

/// ZooMedia 合约 ABI（市场读写面 + Transfer 事件）
pub const ZOO_MEDIA_ABI: &str = r#"[
  {"type":"function","name":"name","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"symbol","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"ownerOf","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"","type":"address"}]},
  {"type":"function","name":"tokenURI","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"","type":"string"}]},
  {"type":"function","name":"tokenMeta","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"","type":"tuple","components":[{"name":"id","type":"uint256"},{"name":"name","type":"string"},{"name":"price","type":"uint256"}]}]},
  {"type":"function","name":"getAllOnSale","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"tuple[]","components":[{"name":"id","type":"uint256"},{"name":"name","type":"string"},{"name":"price","type":"uint256"},{"name":"uri","type":"string"}]}]},
  {"type":"function","name":"purchaseToken","stateMutability":"payable","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"setTokenSale","stateMutability":"nonpayable","inputs":[{"name":"tokenId","type":"uint256"},{"name":"onSale","type":"bool"},{"name":"price","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"safeTransferFrom","stateMutability":"nonpayable","inputs":[{"name":"from","type":"address"},{"name":"to","type":"address"},{"name":"tokenId","type":"uint256"}],"outputs":[]},
  {"type":"event","name":"Transfer","anonymous":false,"inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"tokenId","type":"uint256","indexed":true}]}
]"#;

/// AuctionHouse 合约 ABI（拍卖生命周期 + AuctionCreated 事件）
pub const AUCTION_HOUSE_ABI: &str = r#"[
  {"type":"function","name":"auctions","stateMutability":"view","inputs":[{"name":"auctionId","type":"uint256"}],"outputs":[{"name":"approved","type":"bool"},{"name":"amount","type":"uint256"},{"name":"duration","type":"uint256"},{"name":"firstBidTime","type":"uint256"},{"name":"reservePrice","type":"uint256"},{"name":"curatorFeePercentage","type":"uint8"},{"name":"tokenOwner","type":"address"},{"name":"bidder","type":"address"},{"name":"curator","type":"address"},{"name":"auctionCurrency","type":"address"}]},
  {"type":"function","name":"createAuction","stateMutability":"nonpayable","inputs":[{"name":"tokenId","type":"uint256"},{"name":"tokenContract","type":"address"},{"name":"duration","type":"uint256"},{"name":"reservePrice","type":"uint256"},{"name":"curator","type":"address"},{"name":"curatorFeePercentages","type":"uint8"},{"name":"auctionCurrency","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
  {"type":"function","name":"setAuctionApproval","stateMutability":"nonpayable","inputs":[{"name":"auctionId","type":"uint256"},{"name":"approved","type":"bool"}],"outputs":[]},
  {"type":"function","name":"setAuctionReservePrice","stateMutability":"nonpayable","inputs":[{"name":"auctionId","type":"uint256"},{"name":"reservePrice","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"createBid","stateMutability":"payable","inputs":[{"name":"auctionId","type":"uint256"},{"name":"amount","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"endAuction","stateMutability":"nonpayable","inputs":[{"name":"auctionId","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"cancelAuction","stateMutability":"nonpayable","inputs":[{"name":"auctionId","type":"uint256"}],"outputs":[]},
  {"type":"event","name":"AuctionCreated","anonymous":false,"inputs":[{"name":"auctionId","type":"uint256","indexed":true},{"name":"tokenId","type":"uint256","indexed":true},{"name":"tokenContract","type":"address","indexed":true},{"name":"duration","type":"uint256","indexed":false},{"name":"reservePrice","type":"uint256","indexed":false},{"name":"tokenOwner","type":"address","indexed":false},{"name":"curator","type":"address","indexed":false},{"name":"curatorFeePercentage","type":"uint8","indexed":false},{"name":"auctionCurrency","type":"address","indexed":false}]}
]"#;

static ZOO_MEDIA_ABI_PARSED: Lazy<Abi> = Lazy::new(|| {
    serde_json::from_str(ZOO_MEDIA_ABI).expect("built-in ZooMedia ABI must parse")
});

static AUCTION_HOUSE_ABI_PARSED: Lazy<Abi> = Lazy::new(|| {
    serde_json::from_str(AUCTION_HOUSE_ABI).expect("built-in AuctionHouse ABI must parse")
});

/// `Transfer(address,address,uint256)` 的 topic0
pub static TRANSFER_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from(keccak256("Transfer(address,address,uint256)")));

/// `AuctionCreated(...)` 的 topic0
pub static AUCTION_CREATED_TOPIC: Lazy<H256> = Lazy::new(|| {
    H256::from(keccak256(
        "AuctionCreated(uint256,uint256,address,uint256,uint256,address,address,uint8,address)",
    ))
});

pub fn zoo_media_abi() -> &'static Abi {
    &ZOO_MEDIA_ABI_PARSED
}

pub fn auction_house_abi() -> &'static Abi {
    &AUCTION_HOUSE_ABI_PARSED
}

/// 一条指向接收者的 Transfer 事件记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub token_id: U256,
    pub block_number: u64,
}

/// ZooMedia 合约的类型化读写面
#[async_trait]
pub trait MediaContract: Send + Sync {
    fn address(&self) -> Address;

    async fn name(&self) -> Result<String, MarketError>;

    async fn symbol(&self) -> Result<String, MarketError>;

    async fn balance_of(&self, owner: Address) -> Result<U256, MarketError>;

    async fn owner_of(&self, token_id: U256) -> Result<Address, MarketError>;

    async fn token_meta(&self, token_id: U256) -> Result<TokenMeta, MarketError>;

    async fn token_uri(&self, token_id: U256) -> Result<String, MarketError>;

    /// 全部在售条目（未过滤；空 URI 的条目由上层剔除）
    async fn all_on_sale(&self) -> Result<Vec<TokenMeta>, MarketError>;

    /// 指定区块范围内，以 `recipient` 为接收方的 Transfer 事件
    async fn transfers_to(
        &self,
        recipient: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferRecord>, MarketError>;

    /// 购买交易；`price` 作为原生币支付附带
    async fn purchase_token(&self, token_id: U256, price: U256) -> Result<H256, MarketError>;

    async fn set_token_sale(
        &self,
        token_id: U256,
        on_sale: bool,
        price: U256,
    ) -> Result<H256, MarketError>;

    async fn safe_transfer_from(
        &self,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<H256, MarketError>;
}

/// 把部署记录变成可用合约句柄的能力
#[async_trait]
pub trait ContractConnector: Send + Sync {
    async fn bind(&self, address: Address) -> Result<Arc<dyn MediaContract>, MarketError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ethers 实现
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct EthersMediaContract {
    contract: Contract<ZooClient>,
    address: Address,
}

impl EthersMediaContract {
    pub fn new(address: Address, client: Arc<ZooClient>) -> Self {
        let contract = Contract::new(address, zoo_media_abi().clone(), client);
        Self { contract, address }
    }

    fn abi_err(e: impl std::fmt::Display) -> MarketError {
        MarketError::configuration(format!("ZooMedia ABI mismatch: {}", e))
    }
}

#[async_trait]
impl MediaContract for EthersMediaContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn name(&self) -> Result<String, MarketError> {
        self.contract
            .method::<_, String>("name", ())
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)
    }

    async fn symbol(&self) -> Result<String, MarketError> {
        self.contract
            .method::<_, String>("symbol", ())
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, MarketError> {
        self.contract
            .method::<_, U256>("balanceOf", owner)
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address, MarketError> {
        self.contract
            .method::<_, Address>("ownerOf", token_id)
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)
    }

    async fn token_meta(&self, token_id: U256) -> Result<TokenMeta, MarketError> {
        let (id, name, price) = self
            .contract
            .method::<_, (U256, String, U256)>("tokenMeta", token_id)
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)?;

        // URI 单独读取：tokenMeta 不携带
        let uri = self.token_uri(token_id).await?;

        Ok(TokenMeta {
            id,
            name,
            price,
            uri,
        })
    }

    async fn token_uri(&self, token_id: U256) -> Result<String, MarketError> {
        self.contract
            .method::<_, String>("tokenURI", token_id)
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)
    }

    async fn all_on_sale(&self) -> Result<Vec<TokenMeta>, MarketError> {
        let raw = self
            .contract
            .method::<_, Vec<(U256, String, U256, String)>>("getAllOnSale", ())
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)?;

        Ok(raw
            .into_iter()
            .map(|(id, name, price, uri)| TokenMeta {
                id,
                name,
                price,
                uri,
            })
            .collect())
    }

    async fn transfers_to(
        &self,
        recipient: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferRecord>, MarketError> {
        let filter = Filter::new()
            .address(self.address)
            .topic0(*TRANSFER_TOPIC)
            .topic2(H256::from(recipient))
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .contract
            .client()
            .get_logs(&filter)
            .await
            .map_err(MarketError::remote)?;

        let mut records = Vec::with_capacity(logs.len());
        for log in logs {
            // tokenId 是第三个 indexed 参数
            if log.topics.len() < 4 {
                return Err(MarketError::remote(format!(
                    "malformed Transfer log in tx {:?}",
                    log.transaction_hash
                )));
            }

            records.push(TransferRecord {
                token_id: U256::from_big_endian(log.topics[3].as_bytes()),
                block_number: log.block_number.map(|b| b.as_u64()).unwrap_or(from_block),
            });
        }

        Ok(records)
    }

    async fn purchase_token(&self, token_id: U256, price: U256) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("purchaseToken", token_id)
            .map_err(Self::abi_err)?
            .value(price);

        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }

    async fn set_token_sale(
        &self,
        token_id: U256,
        on_sale: bool,
        price: U256,
    ) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("setTokenSale", (token_id, on_sale, price))
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }

    async fn safe_transfer_from(
        &self,
        from: Address,
        to: Address,
        token_id: U256,
    ) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("safeTransferFrom", (from, to, token_id))
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }
}

/// ethers 连接器：把部署地址绑定到共享签名客户端
pub struct EthersContractConnector {
    client: Arc<ZooClient>,
}

impl EthersContractConnector {
    pub fn new(client: Arc<ZooClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContractConnector for EthersContractConnector {
    async fn bind(&self, address: Address) -> Result<Arc<dyn MediaContract>, MarketError> {
        Ok(Arc::new(EthersMediaContract::new(
            address,
            self.client.clone(),
        )))
    }
}
