//! 代币/用户领域类型

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// 市场中的一个代币
///
/// 身份以 `id` 为准。链上 `tokenURI` 允许重复（同一张图可铸多个代币），
/// 因此不能用 uri 作为去重键。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: U256,
    pub name: String,
    /// 价格，最小货币单位（wei）
    pub price: U256,
    pub uri: String,
}

/// 合约读取的原始代币元数据（tokenMeta / getAllOnSale 返回的形状）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub id: U256,
    pub name: String,
    pub price: U256,
    pub uri: String,
}

impl From<TokenMeta> for Token {
    fn from(meta: TokenMeta) -> Self {
        Self {
            id: meta.id,
            name: meta.name,
            price: meta.price,
            uri: meta.uri,
        }
    }
}

/// 当前用户的派生档案
///
/// 每次查询整体重建，不做增量修补
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub address: Address,
    /// 原生币余额（wei，十进制字符串）
    pub balance_wei: String,
    pub owned_tokens: Vec<Token>,
}

/// 会话状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub is_authenticated: bool,
    pub wallet_address: Option<Address>,
}

/// 已解析的合约绑定信息
///
/// 每次网络选择解析一次；不可变，切换网络时整体替换
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractBindingInfo {
    pub name: String,
    pub symbol: String,
    pub address: Address,
    pub abi_version: String,
}

/// 在售列表投影：过滤掉空 URI 的条目
pub fn filter_listings(metas: Vec<TokenMeta>) -> Vec<Token> {
    metas
        .into_iter()
        .filter(|meta| !meta.uri.is_empty())
        .map(Token::from)
        .collect()
}
