//! 拍卖行客户端
//!
//! 无状态封装：每个网络一个固定合约地址，构造时按 chain id 解析一次。
//! 调用之间不缓存任何本地状态，所有读取都走网络。
//! 对 `Provider` 泛型：只读场景传 `Provider<Http>`，需要签名时传
//! `SignerMiddleware`。

use std::sync::Arc;

use ethers::{
    contract::Contract,
    providers::Middleware,
    types::{Address, TransactionReceipt, H256, U256},
};

use crate::{
    config::Config,
    domain::{
        auction::{bid_payment, Auction, AuctionTuple},
        network::NetworkRegistry,
    },
    error::MarketError,
    infrastructure::contracts::{auction_house_abi, AUCTION_CREATED_TOPIC},
};

pub struct AuctionHouseClient<M: Middleware> {
    chain_id: u64,
    address: Address,
    /// 默认拍卖标的合约（ZooMedia）
    media_address: Address,
    contract: Contract<M>,
}

impl<M: Middleware + 'static> AuctionHouseClient<M> {
    /// 按 chain id 解析拍卖行与媒体合约地址并构造客户端
    pub fn new(
        client: Arc<M>,
        chain_id: u64,
        config: &Config,
        networks: &NetworkRegistry,
    ) -> Result<Self, MarketError> {
        let network = networks.network_name_for(chain_id).ok_or_else(|| {
            MarketError::configuration(format!("network not supported: chain id {}", chain_id))
        })?;

        let address: Address = config
            .auction_house_address(network)
            .ok_or_else(|| {
                MarketError::configuration(format!("no auction house deployed on {}", network))
            })?
            .parse()
            .map_err(|_| MarketError::configuration("invalid auction house address"))?;

        let media_address: Address = config
            .deployment(network, "ZooMedia")
            .ok_or_else(|| {
                MarketError::configuration(format!("no ZooMedia deployment on {}", network))
            })?
            .address
            .parse()
            .map_err(|_| MarketError::configuration("invalid ZooMedia address"))?;

        let contract = Contract::new(address, auction_house_abi().clone(), client);

        Ok(Self {
            chain_id,
            address,
            media_address,
            contract,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn abi_err(e: impl std::fmt::Display) -> MarketError {
        MarketError::configuration(format!("AuctionHouse ABI mismatch: {}", e))
    }

    /// 按 id 读取拍卖
    pub async fn fetch_auction(&self, auction_id: U256) -> Result<Auction, MarketError> {
        let raw = self
            .contract
            .method::<_, AuctionTuple>("auctions", auction_id)
            .map_err(Self::abi_err)?
            .call()
            .await
            .map_err(MarketError::remote)?;

        Ok(Auction::from(raw))
    }

    /// 从交易回执反查其创建的拍卖；回执中没有匹配事件时返回 None
    pub async fn auction_from_receipt(
        &self,
        receipt: &TransactionReceipt,
    ) -> Result<Option<Auction>, MarketError> {
        match auction_id_from_receipt(receipt, self.address) {
            Some(auction_id) => Ok(Some(self.fetch_auction(auction_id).await?)),
            None => Ok(None),
        }
    }

    /// 创建拍卖；`token_address` 缺省为本网络的 ZooMedia 地址
    #[allow(clippy::too_many_arguments)]
    pub async fn create_auction(
        &self,
        token_id: U256,
        duration: U256,
        reserve_price: U256,
        curator: Address,
        curator_fee_percentage: u8,
        auction_currency: Address,
        token_address: Option<Address>,
    ) -> Result<H256, MarketError> {
        let token_contract = token_address.unwrap_or(self.media_address);

        let call = self
            .contract
            .method::<_, U256>(
                "createAuction",
                (
                    token_id,
                    token_contract,
                    duration,
                    reserve_price,
                    curator,
                    curator_fee_percentage,
                    auction_currency,
                ),
            )
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;

        Ok(*pending)
    }

    pub async fn set_auction_approval(
        &self,
        auction_id: U256,
        approved: bool,
    ) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("setAuctionApproval", (auction_id, approved))
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }

    pub async fn set_auction_reserve_price(
        &self,
        auction_id: U256,
        reserve_price: U256,
    ) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("setAuctionReservePrice", (auction_id, reserve_price))
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }

    /// 出价
    ///
    /// 先读取拍卖的结算货币：原生币拍卖必须把金额作为 value 附带，
    /// 代币拍卖绝不能附带 value，否则会重复支付。
    pub async fn create_bid(&self, auction_id: U256, amount: U256) -> Result<H256, MarketError> {
        let auction = self.fetch_auction(auction_id).await?;

        let mut call = self
            .contract
            .method::<_, ()>("createBid", (auction_id, amount))
            .map_err(Self::abi_err)?;

        if let Some(value) = bid_payment(&auction, amount) {
            call = call.value(value);
        }

        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }

    pub async fn end_auction(&self, auction_id: U256) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("endAuction", auction_id)
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }

    pub async fn cancel_auction(&self, auction_id: U256) -> Result<H256, MarketError> {
        let call = self
            .contract
            .method::<_, ()>("cancelAuction", auction_id)
            .map_err(Self::abi_err)?;
        let pending = call.send().await.map_err(MarketError::remote)?;
        Ok(*pending)
    }
}

/// 在回执日志里找拍卖行发出的第一条 AuctionCreated，返回其拍卖 id
///
/// 首个匹配生效；没有匹配返回 None
pub fn auction_id_from_receipt(
    receipt: &TransactionReceipt,
    house_address: Address,
) -> Option<U256> {
    receipt.logs.iter().find_map(|log| {
        let topic0_matches = log.topics.first() == Some(&*AUCTION_CREATED_TOPIC);
        if log.address == house_address && topic0_matches && log.topics.len() >= 2 {
            Some(U256::from_big_endian(log.topics[1].as_bytes()))
        } else {
            None
        }
    })
}
