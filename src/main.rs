//! ZooCore 主入口
//! NFT 市场链上状态同步守护进程

use std::sync::Arc;

use anyhow::Result;
use zoocore::{
    config::Config,
    infrastructure::{
        contracts::EthersContractConnector,
        logging,
        wallet::{WalletConnector, WalletProvider},
    },
    service::market_store::MarketStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载环境变量
    dotenvy::dotenv().ok();

    // ✅ 2. 加载配置（CONFIG_PATH 指定的文件优先）
    let config = match std::env::var("CONFIG_PATH") {
        Ok(path) => Config::from_env_and_file(Some(path.as_str()))?,
        Err(_) => Config::from_env()?,
    };
    config.validate()?;

    // ✅ 3. 初始化日志
    logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to init logging: {}", e))?;

    tracing::info!("🚀 Starting ZooCore state sync daemon");

    let config = Arc::new(config);

    // ✅ 4. 连接钱包
    let connector = WalletConnector::connect(&config.wallet)?;
    let client = connector.client();
    let wallet: Arc<dyn WalletProvider> = Arc::new(connector);
    tracing::info!("✅ Wallet connected");

    // ✅ 5. 初始化市场存储
    let contracts = Arc::new(EthersContractConnector::new(client));
    let store = Arc::new(MarketStore::new(config.clone(), wallet.clone(), contracts)?);

    // ✅ 6. 绑定合约
    let binding = store
        .set_contract(config.wallet.chain_id, "ZooMedia")
        .await?;
    tracing::info!(
        name = %binding.name,
        symbol = %binding.symbol,
        address = %binding.address,
        "✅ Contract bound"
    );

    // ✅ 7. 登录并重建用户档案
    if let Some(address) = wallet.default_account() {
        // 注册服务不可用时不阻塞同步
        match store.login(address).await {
            Ok(user) => tracing::info!(mmid = %user.mmid, "✅ Registry login complete"),
            Err(e) => tracing::warn!(error = %e, "⚠️ Registry login failed, continuing"),
        }

        let profile = store.set_user(Some(address)).await?;
        tracing::info!(
            address = %profile.address,
            balance_wei = %profile.balance_wei,
            owned = profile.owned_tokens.len(),
            "✅ User profile rebuilt"
        );
    }

    // ✅ 8. 观察快照版本变化
    let mut watcher = store.subscribe();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let version = watcher.borrow().version;
            tracing::debug!(version, "snapshot committed");
        }
    });

    // ✅ 9. 周期同步：在售列表 + 待确认交易
    let refresh = std::time::Duration::from_secs(config.sync.listing_refresh_secs);
    tracing::info!(interval_secs = config.sync.listing_refresh_secs, "🎉 Sync loop started");

    loop {
        match store.update_tokens_on_sale().await {
            Ok(listings) => tracing::info!(count = listings.len(), "listings refreshed"),
            Err(e) => tracing::warn!(code = e.code_str(), error = %e, "listing refresh failed"),
        }

        let pending: Vec<_> = store
            .snapshot()
            .transactions
            .pending()
            .iter()
            .map(|t| t.submission_id)
            .collect();

        for submission_id in pending {
            if let Err(e) = store.refresh_transaction(submission_id).await {
                tracing::warn!(%submission_id, error = %e, "transaction refresh failed");
            }
        }

        tokio::time::sleep(refresh).await;
    }
}
