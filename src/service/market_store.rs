//! 市场状态存储
//!
//! 进程级共享的可观察存储：会话、合约绑定、用户档案、在售列表、
//! 已提交交易。所有写操作经由单一写闸门串行执行，每次提交生成
//! 带版本号的新快照并通过 watch 通道广播给观察者。
//!
//! 所有操作返回带分类的 `Result`，调用方可以区分"没有数据"
//! 与"操作失败"。

use std::sync::Arc;

use ethers::types::{Address, U256};
use tokio::sync::{watch, Mutex, RwLock};
use uuid::Uuid;

use crate::{
    config::Config,
    domain::{
        network::NetworkRegistry,
        token::{filter_listings, ContractBindingInfo, Session, Token, UserProfile},
        transaction::{TransactionLog, TxKind, TxStatus},
    },
    error::MarketError,
    infrastructure::{
        contracts::{ContractConnector, MediaContract},
        wallet::WalletProvider,
    },
    metrics,
    service::{
        ownership::OwnershipResolver,
        registry_client::{RegisteredUser, RegistryClient},
    },
};

/// 某一时刻的完整市场状态
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    /// 单调递增的快照版本号，每次提交加一
    pub version: u64,
    pub session: Session,
    pub contract: Option<ContractBindingInfo>,
    pub user: Option<UserProfile>,
    pub tokens_on_sale: Vec<Token>,
    pub transactions: TransactionLog,
}

pub struct MarketStore {
    config: Arc<Config>,
    networks: NetworkRegistry,
    wallet: Arc<dyn WalletProvider>,
    connector: Arc<dyn ContractConnector>,
    resolver: OwnershipResolver,
    registry: RegistryClient,
    /// 当前绑定的合约句柄（与快照中的 ContractBindingInfo 一起整体替换）
    media: RwLock<Option<Arc<dyn MediaContract>>>,
    /// 写闸门：所有变更操作串行执行
    write_gate: Mutex<()>,
    snapshot_tx: watch::Sender<MarketSnapshot>,
}

impl MarketStore {
    pub fn new(
        config: Arc<Config>,
        wallet: Arc<dyn WalletProvider>,
        connector: Arc<dyn ContractConnector>,
    ) -> Result<Self, MarketError> {
        let resolver = OwnershipResolver::new(&config.scan);
        let registry = RegistryClient::new(&config.registry)?;
        let (snapshot_tx, _) = watch::channel(MarketSnapshot::default());

        Ok(Self {
            config,
            networks: NetworkRegistry::new(),
            wallet,
            connector,
            resolver,
            registry,
            media: RwLock::new(None),
            write_gate: Mutex::new(()),
            snapshot_tx,
        })
    }

    /// 当前快照
    pub fn snapshot(&self) -> MarketSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// 订阅快照变化
    pub fn subscribe(&self) -> watch::Receiver<MarketSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 提交一次状态变更：复制当前快照、应用变更、版本号加一、广播
    fn commit<F: FnOnce(&mut MarketSnapshot)>(&self, mutate: F) -> MarketSnapshot {
        let mut next = self.snapshot_tx.borrow().clone();
        mutate(&mut next);
        next.version += 1;
        self.snapshot_tx.send_replace(next.clone());
        next
    }

    fn track<T>(op: &'static str, result: &Result<T, MarketError>) {
        match result {
            Ok(_) => metrics::count_ok(op),
            Err(e) => {
                metrics::count_err(op);
                tracing::warn!(op, code = e.code_str(), error = %e, "store operation failed");
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 会话
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 设置会话标志；无校验，仅副作用
    pub async fn set_authenticated(&self, authenticated: bool) {
        let _gate = self.write_gate.lock().await;
        self.commit(|s| s.session.is_authenticated = authenticated);
    }

    /// 断开连接：清空会话与用户档案
    pub async fn disconnect(&self) {
        let _gate = self.write_gate.lock().await;
        self.commit(|s| {
            s.session = Session::default();
            s.user = None;
        });
        tracing::info!("session cleared");
    }

    /// 钱包登录时的注册流程：已注册则取回，否则注册
    pub async fn login(&self, address: Address) -> Result<RegisteredUser, MarketError> {
        let result = match self.registry.fetch_user(address).await? {
            Some(user) => Ok(user),
            None => self.registry.register(address).await,
        };
        Self::track("login", &result);
        result
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 合约绑定
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 为指定链绑定合约
    ///
    /// 失败时（网络不支持/部署记录缺失/RPC失败）之前的绑定保持不变；
    /// 成功时句柄与绑定信息原子替换，同时丢弃用户档案与在售列表，
    /// 避免跨网络的陈旧数据。
    pub async fn set_contract(
        &self,
        chain_id: u64,
        contract_name: &str,
    ) -> Result<ContractBindingInfo, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = self.set_contract_inner(chain_id, contract_name).await;
        Self::track("set_contract", &result);
        result
    }

    async fn set_contract_inner(
        &self,
        chain_id: u64,
        contract_name: &str,
    ) -> Result<ContractBindingInfo, MarketError> {
        let network = self.networks.network_name_for(chain_id).ok_or_else(|| {
            MarketError::configuration(format!("network not supported: chain id {}", chain_id))
        })?;

        let record = self.config.deployment(network, contract_name).ok_or_else(|| {
            MarketError::configuration(format!(
                "no deployment record for {} on {}",
                contract_name, network
            ))
        })?;

        let address: Address = record.address.parse().map_err(|_| {
            MarketError::configuration(format!("invalid deployment address: {}", record.address))
        })?;

        let media = self.connector.bind(address).await?;

        let name = media.name().await?;
        let symbol = media.symbol().await?;

        let info = ContractBindingInfo {
            name,
            symbol,
            address,
            abi_version: record.abi_version.clone(),
        };

        // 原子替换：句柄与绑定信息要么都更新，要么都不更新
        *self.media.write().await = Some(media);
        self.commit(|s| {
            s.contract = Some(info.clone());
            s.user = None;
            s.tokens_on_sale.clear();
        });

        tracing::info!(
            network,
            contract = contract_name,
            address = %info.address,
            symbol = %info.symbol,
            "contract bound"
        );

        Ok(info)
    }

    async fn bound_media(&self) -> Result<Arc<dyn MediaContract>, MarketError> {
        self.media
            .read()
            .await
            .clone()
            .ok_or_else(|| MarketError::precondition("no contract bound"))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 用户
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 重建用户档案（整体替换，不做增量修补）
    pub async fn set_user(&self, address: Option<Address>) -> Result<UserProfile, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = self.set_user_inner(address).await;
        Self::track("set_user", &result);
        result
    }

    async fn set_user_inner(&self, address: Option<Address>) -> Result<UserProfile, MarketError> {
        let media = self.bound_media().await?;

        let stored = self.snapshot().user.map(|u| u.address);
        let target = address
            .or(stored)
            .ok_or_else(|| MarketError::precondition("no user address available"))?;

        let balance = self.wallet.native_balance(target).await?;
        let owned_tokens = self
            .resolver
            .owned_tokens(self.wallet.as_ref(), media.as_ref(), target)
            .await?;

        let profile = UserProfile {
            address: target,
            balance_wei: balance.to_string(),
            owned_tokens,
        };

        self.commit(|s| {
            s.session.is_authenticated = true;
            s.session.wallet_address = Some(target);
            s.user = Some(profile.clone());
        });

        Ok(profile)
    }

    /// 查询某地址当前持有的代币（不改变存储状态）
    pub async fn user_tokens(&self, address: Option<Address>) -> Result<Vec<Token>, MarketError> {
        let result = self.user_tokens_inner(address).await;
        Self::track("user_tokens", &result);
        result
    }

    async fn user_tokens_inner(
        &self,
        address: Option<Address>,
    ) -> Result<Vec<Token>, MarketError> {
        let media = self.bound_media().await?;

        let stored = self.snapshot().user.map(|u| u.address);
        let target = address
            .or(stored)
            .ok_or_else(|| MarketError::precondition("no user address available"))?;

        self.resolver
            .owned_tokens(self.wallet.as_ref(), media.as_ref(), target)
            .await
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 市场操作
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 购买代币：提交交易并登记追踪，不等待确认
    pub async fn buy_token(&self, token_id: U256, price: U256) -> Result<Uuid, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = async {
            let media = self.bound_media().await?;
            let tx_hash = media.purchase_token(token_id, price).await?;

            metrics::inc_tx_submitted();
            let mut submission_id = Uuid::nil();
            self.commit(|s| {
                submission_id = s.transactions.record(tx_hash, TxKind::Purchase);
            });

            tracing::info!(
                token_id = %token_id,
                price = %price,
                tx_hash = %tx_hash,
                "purchase submitted"
            );
            Ok(submission_id)
        }
        .await;
        Self::track("buy_token", &result);
        result
    }

    /// 刷新在售列表：整体替换，过滤空 URI 条目
    pub async fn update_tokens_on_sale(&self) -> Result<Vec<Token>, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = async {
            let media = self.bound_media().await?;
            let listings = filter_listings(media.all_on_sale().await?);

            self.commit(|s| s.tokens_on_sale = listings.clone());
            Ok(listings)
        }
        .await;
        Self::track("update_tokens_on_sale", &result);
        result
    }

    /// 切换代币的在售状态/价格；调用方必须是持有者
    pub async fn set_token_sale(
        &self,
        token_id: U256,
        price: U256,
        on_sale: bool,
    ) -> Result<Uuid, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = async {
            let media = self.bound_media().await?;
            self.require_user()?;

            let tx_hash = media.set_token_sale(token_id, on_sale, price).await?;

            metrics::inc_tx_submitted();
            let mut submission_id = Uuid::nil();
            self.commit(|s| {
                submission_id = s.transactions.record(tx_hash, TxKind::SaleToggle);
            });
            Ok(submission_id)
        }
        .await;
        Self::track("set_token_sale", &result);
        result
    }

    /// ERC-721 安全转移
    pub async fn transfer_token(&self, token_id: U256, to: Address) -> Result<Uuid, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = async {
            let media = self.bound_media().await?;
            let from = self.require_user()?;

            let tx_hash = media.safe_transfer_from(from, to, token_id).await?;

            metrics::inc_tx_submitted();
            let mut submission_id = Uuid::nil();
            self.commit(|s| {
                submission_id = s.transactions.record(tx_hash, TxKind::Transfer);
            });
            Ok(submission_id)
        }
        .await;
        Self::track("transfer_token", &result);
        result
    }

    fn require_user(&self) -> Result<Address, MarketError> {
        self.snapshot()
            .user
            .map(|u| u.address)
            .ok_or_else(|| MarketError::precondition("no user profile"))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 交易追踪
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// 推进某笔已提交交易的确认生命周期
    pub async fn refresh_transaction(&self, submission_id: Uuid) -> Result<TxStatus, MarketError> {
        let _gate = self.write_gate.lock().await;
        let result = self.refresh_transaction_inner(submission_id).await;
        Self::track("refresh_transaction", &result);
        result
    }

    async fn refresh_transaction_inner(
        &self,
        submission_id: Uuid,
    ) -> Result<TxStatus, MarketError> {
        let entry = self
            .snapshot()
            .transactions
            .get(&submission_id)
            .cloned()
            .ok_or_else(|| {
                MarketError::precondition(format!("unknown submission id: {}", submission_id))
            })?;

        // 终态不再查询
        if entry.status != TxStatus::Submitted {
            return Ok(entry.status);
        }

        let status = match self.wallet.transaction_receipt(entry.tx_hash).await? {
            None => TxStatus::Submitted,
            Some(receipt) => {
                if receipt.status == Some(0) {
                    metrics::inc_tx_failed();
                    TxStatus::Failed
                } else {
                    metrics::inc_tx_confirmed();
                    TxStatus::Confirmed {
                        block_number: receipt.block_number.unwrap_or_default(),
                    }
                }
            }
        };

        if status != TxStatus::Submitted {
            let committed = status.clone();
            self.commit(|s| {
                s.transactions.update_status(&submission_id, committed);
            });
        }

        Ok(status)
    }
}
