//! 市场状态同步集成测试
//!
//! 使用内存版钱包/合约实现覆盖存储与所有权解析的行为约定

mod common;

use std::sync::Arc;

use common::{addr, test_config, MockConnector, MockMedia, MockWallet};
use ethers::types::U256;
use zoocore::{
    domain::transaction::TxStatus,
    service::market_store::MarketStore,
};

const RINKEBY: u64 = 4;

fn build_store(media: MockMedia, wallet: MockWallet) -> (Arc<MarketStore>, Arc<MockMedia>, Arc<MockWallet>) {
    let media = Arc::new(media);
    let wallet = Arc::new(wallet);
    let connector = Arc::new(MockConnector {
        media: media.clone(),
    });

    let store = MarketStore::new(Arc::new(test_config()), wallet.clone(), connector).unwrap();
    (Arc::new(store), media, wallet)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 合约绑定
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn set_contract_binds_and_reads_metadata() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));

    let binding = store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    assert_eq!(binding.name, "ZooMedia");
    assert_eq!(binding.symbol, "ZOO");
    assert_eq!(binding.abi_version, "1");

    let snapshot = store.snapshot();
    assert_eq!(snapshot.contract, Some(binding));
    assert_eq!(snapshot.version, 1);
}

#[tokio::test]
async fn set_contract_unknown_network_keeps_prior_binding() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));

    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    let before = store.snapshot();

    // hardhat (31337) 已注册为网络，但没有部署记录
    let err = store.set_contract(31337, "ZooMedia").await.unwrap_err();
    assert_eq!(err.code_str(), "configuration_error");

    // 完全未知的 chain id 同样报配置错误
    let err = store.set_contract(5, "ZooMedia").await.unwrap_err();
    assert_eq!(err.code_str(), "configuration_error");

    let after = store.snapshot();
    assert_eq!(after.contract, before.contract);
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn rebinding_discards_user_and_listings() {
    let media = MockMedia::new()
        .with_token(1, addr(0xaa), "ipfs://one")
        .with_transfer(addr(0xaa), 1, 3)
        .with_listing(1, "ipfs://one", 500);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));

    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    store.set_user(Some(addr(0xaa))).await.unwrap();
    store.update_tokens_on_sale().await.unwrap();

    let populated = store.snapshot();
    assert!(populated.user.is_some());
    assert!(!populated.tokens_on_sale.is_empty());

    // 重新绑定：整体替换，丢弃跨网络的派生状态
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let rebound = store.snapshot();
    assert!(rebound.contract.is_some());
    assert!(rebound.user.is_none());
    assert!(rebound.tokens_on_sale.is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 用户档案
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn set_user_without_binding_is_precondition_error() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));

    let err = store.set_user(Some(addr(0xaa))).await.unwrap_err();
    assert_eq!(err.code_str(), "precondition_error");
    assert!(store.snapshot().user.is_none());
}

#[tokio::test]
async fn set_user_without_address_is_precondition_error() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let err = store.set_user(None).await.unwrap_err();
    assert_eq!(err.code_str(), "precondition_error");
}

#[tokio::test]
async fn set_user_rebuilds_profile_and_authenticates() {
    let media = MockMedia::new()
        .with_token(7, addr(0xaa), "ipfs://seven")
        .with_transfer(addr(0xaa), 7, 12);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));

    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    let profile = store.set_user(Some(addr(0xaa))).await.unwrap();

    assert_eq!(profile.address, addr(0xaa));
    assert_eq!(profile.balance_wei, U256::from(10u64).pow(U256::from(18u64)).to_string());
    assert_eq!(profile.owned_tokens.len(), 1);

    let snapshot = store.snapshot();
    assert!(snapshot.session.is_authenticated);
    assert_eq!(snapshot.session.wallet_address, Some(addr(0xaa)));
}

#[tokio::test]
async fn concurrent_set_user_calls_serialize() {
    let media = MockMedia::new()
        .with_token(1, addr(0xaa), "ipfs://one")
        .with_transfer(addr(0xaa), 1, 2);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));

    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    let before = store.snapshot().version;

    let (a, b) = tokio::join!(
        store.set_user(Some(addr(0xaa))),
        store.set_user(Some(addr(0xaa)))
    );
    a.unwrap();
    b.unwrap();

    // 两次提交各占一个版本号，互不覆盖
    assert_eq!(store.snapshot().version, before + 2);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 所有权解析
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn ownership_is_empty_without_transfer_events() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let tokens = store.user_tokens(Some(addr(0xcc))).await.unwrap();
    assert!(tokens.is_empty());
}

#[tokio::test]
async fn ownership_follows_the_current_owner() {
    // 代币 1: A 收到后转给 B，当前持有者是 B
    // 代币 2: A 收到并持有
    let media = MockMedia::new()
        .with_token(1, addr(0xbb), "ipfs://one")
        .with_token(2, addr(0xaa), "ipfs://two")
        .with_transfer(addr(0xaa), 1, 3)
        .with_transfer(addr(0xaa), 2, 5)
        .with_transfer(addr(0xbb), 1, 9);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let a_tokens = store.user_tokens(Some(addr(0xaa))).await.unwrap();
    let a_ids: Vec<u64> = a_tokens.iter().map(|t| t.id.as_u64()).collect();
    assert_eq!(a_ids, vec![2]);

    let b_tokens = store.user_tokens(Some(addr(0xbb))).await.unwrap();
    let b_ids: Vec<u64> = b_tokens.iter().map(|t| t.id.as_u64()).collect();
    assert_eq!(b_ids, vec![1]);
}

#[tokio::test]
async fn ownership_dedups_repeated_transfers_by_token_id() {
    // 同一代币多次转入同一地址：结果只出现一次
    let media = MockMedia::new()
        .with_token(1, addr(0xaa), "ipfs://one")
        .with_transfer(addr(0xaa), 1, 2)
        .with_transfer(addr(0xaa), 1, 8)
        .with_transfer(addr(0xaa), 1, 21);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let tokens = store.user_tokens(Some(addr(0xaa))).await.unwrap();
    assert_eq!(tokens.len(), 1);
}

#[tokio::test]
async fn ownership_failure_is_distinguishable_from_empty() {
    let mut media = MockMedia::new()
        .with_token(1, addr(0xaa), "ipfs://one")
        .with_transfer(addr(0xaa), 1, 2);
    media.fail_owner_of = true;
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let err = store.user_tokens(Some(addr(0xaa))).await.unwrap_err();
    assert_eq!(err.code_str(), "remote_call_error");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 在售列表
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn listings_exclude_empty_uri_entries() {
    let media = MockMedia::new()
        .with_listing(1, "ipfs://one", 100)
        .with_listing(2, "", 200)
        .with_listing(3, "ipfs://three", 300);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let listings = store.update_tokens_on_sale().await.unwrap();
    let ids: Vec<u64> = listings.iter().map(|t| t.id.as_u64()).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(store.snapshot().tokens_on_sale, listings);
}

#[tokio::test]
async fn listing_refresh_is_idempotent() {
    let media = MockMedia::new()
        .with_listing(1, "ipfs://one", 100)
        .with_listing(2, "ipfs://two", 200);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let first = store.update_tokens_on_sale().await.unwrap();
    let second = store.update_tokens_on_sale().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn listing_refresh_without_binding_fails() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));

    let err = store.update_tokens_on_sale().await.unwrap_err();
    assert_eq!(err.code_str(), "precondition_error");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 交易提交与追踪
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn buy_token_records_tracked_transaction() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let submission_id = store
        .buy_token(U256::from(1u64), U256::from(500u64))
        .await
        .unwrap();

    let snapshot = store.snapshot();
    let entry = snapshot.transactions.get(&submission_id).unwrap();
    assert_eq!(entry.status, TxStatus::Submitted);
}

#[tokio::test]
async fn every_submission_stays_tracked() {
    let media = MockMedia::new().with_token(1, addr(0xaa), "ipfs://one");
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    store.set_user(Some(addr(0xaa))).await.unwrap();

    let first = store
        .buy_token(U256::from(1u64), U256::from(500u64))
        .await
        .unwrap();
    let second = store
        .transfer_token(U256::from(1u64), addr(0xbb))
        .await
        .unwrap();

    // 提交新交易不会丢弃对旧交易的追踪
    let snapshot = store.snapshot();
    assert_ne!(first, second);
    assert_eq!(snapshot.transactions.len(), 2);
}

#[tokio::test]
async fn refresh_transaction_advances_lifecycle() {
    let (store, _, wallet) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let submission_id = store
        .buy_token(U256::from(1u64), U256::from(500u64))
        .await
        .unwrap();

    // 尚无回执：仍为 Submitted
    let status = store.refresh_transaction(submission_id).await.unwrap();
    assert_eq!(status, TxStatus::Submitted);

    // 放置成功回执后推进为 Confirmed
    let tx_hash = store
        .snapshot()
        .transactions
        .get(&submission_id)
        .unwrap()
        .tx_hash;
    wallet.put_receipt(tx_hash, 19, 1);

    let status = store.refresh_transaction(submission_id).await.unwrap();
    assert_eq!(status, TxStatus::Confirmed { block_number: 19 });
}

#[tokio::test]
async fn refresh_transaction_marks_reverted_as_failed() {
    let (store, _, wallet) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let submission_id = store
        .buy_token(U256::from(1u64), U256::from(500u64))
        .await
        .unwrap();
    let tx_hash = store
        .snapshot()
        .transactions
        .get(&submission_id)
        .unwrap()
        .tx_hash;
    wallet.put_receipt(tx_hash, 20, 0);

    let status = store.refresh_transaction(submission_id).await.unwrap();
    assert_eq!(status, TxStatus::Failed);
}

#[tokio::test]
async fn sale_toggle_requires_user_profile() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();

    let err = store
        .set_token_sale(U256::from(1u64), U256::from(500u64), true)
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "precondition_error");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 会话
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn disconnect_clears_session_and_profile() {
    let media = MockMedia::new()
        .with_token(1, addr(0xaa), "ipfs://one")
        .with_transfer(addr(0xaa), 1, 2);
    let (store, _, _) = build_store(media, MockWallet::new(addr(0xaa)));
    store.set_contract(RINKEBY, "ZooMedia").await.unwrap();
    store.set_user(Some(addr(0xaa))).await.unwrap();

    store.disconnect().await;

    let snapshot = store.snapshot();
    assert!(!snapshot.session.is_authenticated);
    assert!(snapshot.session.wallet_address.is_none());
    assert!(snapshot.user.is_none());
}

#[tokio::test]
async fn observers_see_every_committed_version() {
    let (store, _, _) = build_store(MockMedia::new(), MockWallet::new(addr(0xaa)));
    let mut watcher = store.subscribe();

    store.set_authenticated(true).await;
    watcher.changed().await.unwrap();

    let seen = watcher.borrow_and_update().clone();
    assert_eq!(seen.version, 1);
    assert!(seen.session.is_authenticated);
}
