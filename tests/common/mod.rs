//! 集成测试辅助：内存版钱包/合约实现

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use zoocore::{
    config::{Config, DeploymentRecord, RegistryConfig, ScanConfig},
    domain::token::TokenMeta,
    error::MarketError,
    infrastructure::{
        contracts::{ContractConnector, MediaContract, TransferRecord},
        wallet::{ReceiptSummary, WalletProvider},
    },
};

pub const MEDIA_ADDR: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

/// 测试配置：rinkeby 上有 ZooMedia 部署记录，hardhat 上没有
pub fn test_config() -> Config {
    let mut config = Config::from_env().unwrap();

    config.deployments.clear();
    let mut contracts = HashMap::new();
    contracts.insert(
        "ZooMedia".to_string(),
        DeploymentRecord {
            address: MEDIA_ADDR.to_string(),
            abi_version: "1".to_string(),
        },
    );
    config.deployments.insert("rinkeby".to_string(), contracts);

    config.registry = RegistryConfig {
        base_url: "http://127.0.0.1:3000".to_string(),
        timeout_secs: 1,
    };
    config.scan = ScanConfig {
        page_size: 10,
        verify_concurrency: 4,
    };

    config
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 内存钱包
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct MockWallet {
    pub chain_id: u64,
    pub account: Address,
    pub latest_block: u64,
    pub balances: HashMap<Address, U256>,
    pub receipts: Mutex<HashMap<H256, ReceiptSummary>>,
}

impl MockWallet {
    pub fn new(account: Address) -> Self {
        let mut balances = HashMap::new();
        balances.insert(account, U256::from(10u64).pow(U256::from(18u64)));

        Self {
            chain_id: 4,
            account,
            latest_block: 25,
            balances,
            receipts: Mutex::new(HashMap::new()),
        }
    }

    /// 为某笔交易放置回执，模拟确认
    pub fn put_receipt(&self, tx_hash: H256, block_number: u64, status: u64) {
        self.receipts.lock().unwrap().insert(
            tx_hash,
            ReceiptSummary {
                tx_hash,
                block_number: Some(block_number),
                status: Some(status),
            },
        );
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn default_account(&self) -> Option<Address> {
        Some(self.account)
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, MarketError> {
        Ok(vec![self.account])
    }

    async fn native_balance(&self, address: Address) -> Result<U256, MarketError> {
        Ok(self.balances.get(&address).copied().unwrap_or_default())
    }

    async fn latest_block(&self) -> Result<u64, MarketError> {
        Ok(self.latest_block)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<ReceiptSummary>, MarketError> {
        Ok(self.receipts.lock().unwrap().get(&tx_hash).cloned())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 内存合约
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct MockMediaState {
    /// (接收者, 记录)
    pub transfers: Vec<(Address, TransferRecord)>,
    pub owners: HashMap<U256, Address>,
    pub metas: HashMap<U256, TokenMeta>,
    pub on_sale: Vec<TokenMeta>,
    pub tx_counter: u64,
}

pub struct MockMedia {
    pub address: Address,
    pub state: Mutex<MockMediaState>,
    /// 为真时 ownerOf 返回 RPC 错误（整个解析操作应当失败）
    pub fail_owner_of: bool,
}

impl MockMedia {
    pub fn new() -> Self {
        Self {
            address: MEDIA_ADDR.parse().unwrap(),
            state: Mutex::new(MockMediaState::default()),
            fail_owner_of: false,
        }
    }

    pub fn with_token(self, id: u64, owner: Address, uri: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.owners.insert(U256::from(id), owner);
            state.metas.insert(
                U256::from(id),
                TokenMeta {
                    id: U256::from(id),
                    name: format!("Animal #{}", id),
                    price: U256::from(1_000u64),
                    uri: uri.to_string(),
                },
            );
        }
        self
    }

    pub fn with_transfer(self, to: Address, token_id: u64, block_number: u64) -> Self {
        self.state.lock().unwrap().transfers.push((
            to,
            TransferRecord {
                token_id: U256::from(token_id),
                block_number,
            },
        ));
        self
    }

    pub fn with_listing(self, id: u64, uri: &str, price: u64) -> Self {
        self.state.lock().unwrap().on_sale.push(TokenMeta {
            id: U256::from(id),
            name: format!("Animal #{}", id),
            price: U256::from(price),
            uri: uri.to_string(),
        });
        self
    }

    fn next_tx_hash(&self) -> H256 {
        let mut state = self.state.lock().unwrap();
        state.tx_counter += 1;
        H256::from_low_u64_be(state.tx_counter)
    }
}

#[async_trait]
impl MediaContract for MockMedia {
    fn address(&self) -> Address {
        self.address
    }

    async fn name(&self) -> Result<String, MarketError> {
        Ok("ZooMedia".to_string())
    }

    async fn symbol(&self) -> Result<String, MarketError> {
        Ok("ZOO".to_string())
    }

    async fn balance_of(&self, owner: Address) -> Result<U256, MarketError> {
        let state = self.state.lock().unwrap();
        let count = state.owners.values().filter(|o| **o == owner).count();
        Ok(U256::from(count))
    }

    async fn owner_of(&self, token_id: U256) -> Result<Address, MarketError> {
        if self.fail_owner_of {
            return Err(MarketError::remote("node unavailable"));
        }

        self.state
            .lock()
            .unwrap()
            .owners
            .get(&token_id)
            .copied()
            .ok_or_else(|| MarketError::remote("ERC721: owner query for nonexistent token"))
    }

    async fn token_meta(&self, token_id: U256) -> Result<TokenMeta, MarketError> {
        self.state
            .lock()
            .unwrap()
            .metas
            .get(&token_id)
            .cloned()
            .ok_or_else(|| MarketError::remote("no meta for token"))
    }

    async fn token_uri(&self, token_id: U256) -> Result<String, MarketError> {
        Ok(self.token_meta(token_id).await?.uri)
    }

    async fn all_on_sale(&self) -> Result<Vec<TokenMeta>, MarketError> {
        Ok(self.state.lock().unwrap().on_sale.clone())
    }

    async fn transfers_to(
        &self,
        recipient: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferRecord>, MarketError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transfers
            .iter()
            .filter(|(to, record)| {
                *to == recipient
                    && record.block_number >= from_block
                    && record.block_number <= to_block
            })
            .map(|(_, record)| *record)
            .collect())
    }

    async fn purchase_token(&self, _token_id: U256, _price: U256) -> Result<H256, MarketError> {
        Ok(self.next_tx_hash())
    }

    async fn set_token_sale(
        &self,
        _token_id: U256,
        _on_sale: bool,
        _price: U256,
    ) -> Result<H256, MarketError> {
        Ok(self.next_tx_hash())
    }

    async fn safe_transfer_from(
        &self,
        _from: Address,
        _to: Address,
        _token_id: U256,
    ) -> Result<H256, MarketError> {
        Ok(self.next_tx_hash())
    }
}

pub struct MockConnector {
    pub media: Arc<MockMedia>,
}

#[async_trait]
impl ContractConnector for MockConnector {
    async fn bind(&self, _address: Address) -> Result<Arc<dyn MediaContract>, MarketError> {
        Ok(self.media.clone())
    }
}
