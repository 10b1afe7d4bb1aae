//! 拍卖领域类型
//!
//! 链上拍卖结构的只读投影，仅由合约交易改变，客户端从不直接修改

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// 合约 `auctions(uint256)` 返回的原始元组
pub type AuctionTuple = (
    bool,    // approved
    U256,    // amount
    U256,    // duration
    U256,    // firstBidTime
    U256,    // reservePrice
    u8,      // curatorFeePercentage
    Address, // tokenOwner
    Address, // bidder
    Address, // curator
    Address, // auctionCurrency
);

/// 链上拍卖状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub approved: bool,
    pub amount: U256,
    pub duration: U256,
    pub first_bid_time: U256,
    pub reserve_price: U256,
    pub curator_fee_percentage: u8,
    pub token_owner: Address,
    pub bidder: Address,
    pub curator: Address,
    /// 结算货币；零地址表示原生币拍卖
    pub auction_currency: Address,
}

impl From<AuctionTuple> for Auction {
    fn from(t: AuctionTuple) -> Self {
        Self {
            approved: t.0,
            amount: t.1,
            duration: t.2,
            first_bid_time: t.3,
            reserve_price: t.4,
            curator_fee_percentage: t.5,
            token_owner: t.6,
            bidder: t.7,
            curator: t.8,
            auction_currency: t.9,
        }
    }
}

impl Auction {
    /// 原生币拍卖（结算货币为零地址）
    pub fn is_native_currency(&self) -> bool {
        self.auction_currency == Address::zero()
    }
}

/// 出价时需要附带的原生币支付
///
/// 原生币拍卖必须把出价金额一并作为 value 附上；
/// 代币拍卖附带 value 会造成重复支付，这里必须返回 None。
pub fn bid_payment(auction: &Auction, amount: U256) -> Option<U256> {
    if auction.is_native_currency() {
        Some(amount)
    } else {
        None
    }
}
