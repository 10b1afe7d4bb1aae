//! 钱包连接模块
//!
//! 钱包能力边界：账户访问、签名、余额与回执查询。
//! 核心层只消费 `WalletProvider` trait，具体实现由 ethers 的
//! `Provider<Http>` + `LocalWallet` 组合而成。

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, H256, U256},
};

use crate::{config::WalletConfig, error::MarketError};

/// 统一的签名客户端类型
pub type ZooClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// 已确认交易的回执摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    /// 1 = 成功，0 = 回滚
    pub status: Option<u64>,
}

/// 钱包能力边界
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn chain_id(&self) -> u64;

    /// 签名账户（若有）
    fn default_account(&self) -> Option<Address>;

    /// 请求账户访问
    async fn request_accounts(&self) -> Result<Vec<Address>, MarketError>;

    /// 原生币余额（wei）
    async fn native_balance(&self, address: Address) -> Result<U256, MarketError>;

    /// 最新区块高度
    async fn latest_block(&self) -> Result<u64, MarketError>;

    /// 交易回执（尚未打包时返回 None）
    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ReceiptSummary>, MarketError>;
}

/// ethers 实现：JSON-RPC 节点 + 本地签名私钥
#[derive(Debug)]
pub struct WalletConnector {
    client: Arc<ZooClient>,
    chain_id: u64,
    address: Address,
}

impl WalletConnector {
    /// 建立连接并构造签名客户端
    pub fn connect(config: &WalletConfig) -> Result<Self, MarketError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| MarketError::configuration(format!("invalid RPC url: {}", e)))?;

        if config.signer_key.is_empty() {
            return Err(MarketError::configuration(
                "no signer key configured (ZOO_SIGNER_KEY)",
            ));
        }

        let wallet: LocalWallet = config
            .signer_key
            .parse()
            .map_err(|e| MarketError::configuration(format!("invalid signer key: {}", e)))?;
        let wallet = wallet.with_chain_id(config.chain_id);
        let address = wallet.address();

        let client = Arc::new(SignerMiddleware::new(provider, wallet));

        tracing::info!(
            address = %address,
            chain_id = config.chain_id,
            rpc = %config.rpc_url,
            "Wallet connected"
        );

        Ok(Self {
            client,
            chain_id: config.chain_id,
            address,
        })
    }

    /// 共享签名客户端（用于构造合约句柄）
    pub fn client(&self) -> Arc<ZooClient> {
        self.client.clone()
    }
}

#[async_trait]
impl WalletProvider for WalletConnector {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn default_account(&self) -> Option<Address> {
        Some(self.address)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, MarketError> {
        // 节点管理的账户，加上本地签名账户
        let mut accounts = self
            .client
            .get_accounts()
            .await
            .map_err(MarketError::remote)?;

        if !accounts.contains(&self.address) {
            accounts.insert(0, self.address);
        }

        Ok(accounts)
    }

    async fn native_balance(&self, address: Address) -> Result<U256, MarketError> {
        self.client
            .get_balance(address, None)
            .await
            .map_err(MarketError::remote)
    }

    async fn latest_block(&self) -> Result<u64, MarketError> {
        let block = self
            .client
            .get_block_number()
            .await
            .map_err(MarketError::remote)?;
        Ok(block.as_u64())
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ReceiptSummary>, MarketError> {
        let receipt = self
            .client
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(MarketError::remote)?;

        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash,
            block_number: r.block_number.map(|b| b.as_u64()),
            status: r.status.map(|s| s.as_u64()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;

    fn test_config(key: &str) -> WalletConfig {
        WalletConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            signer_key: key.to_string(),
            chain_id: 31337,
        }
    }

    #[test]
    fn test_connect_requires_signer_key() {
        let err = WalletConnector::connect(&test_config("")).unwrap_err();
        assert_eq!(err.code_str(), "configuration_error");
    }

    #[test]
    fn test_connect_rejects_bad_key() {
        let err = WalletConnector::connect(&test_config("zz-not-hex")).unwrap_err();
        assert_eq!(err.code_str(), "configuration_error");
    }

    #[test]
    fn test_connect_with_dev_key() {
        // hardhat 默认账户 #0 的公开测试私钥
        let connector = WalletConnector::connect(&test_config(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        ))
        .unwrap();

        assert_eq!(connector.chain_id(), 31337);
        assert!(connector.default_account().is_some());
    }
}
