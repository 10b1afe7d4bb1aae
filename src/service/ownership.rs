//! 代币所有权解析服务
//!
//! 通过回放 Transfer 事件推导某地址当前持有的代币集合。
//! 事件只记录历史转移，不代表当前状态：收到过又转走的代币必须剔除，
//! 因此每个候选代币都要用 ownerOf 做链上校验。
//!
//! 扫描按固定区块跨度分页，校验调用施加并发上限，
//! 避免随历史增长出现无界延迟。

use std::collections::HashSet;

use ethers::types::{Address, U256};
use futures::{stream, StreamExt, TryStreamExt};

use crate::{
    config::ScanConfig,
    domain::token::Token,
    error::MarketError,
    infrastructure::{
        contracts::{MediaContract, TransferRecord},
        wallet::WalletProvider,
    },
    metrics,
};

pub struct OwnershipResolver {
    page_size: u64,
    verify_concurrency: usize,
}

impl OwnershipResolver {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            verify_concurrency: config.verify_concurrency.max(1),
        }
    }

    /// 解析 `address` 当前持有的代币，按事件首次出现的顺序返回
    ///
    /// 任何一步出错都会放弃整个操作并返回 RemoteCall 错误，不产生部分结果
    pub async fn owned_tokens(
        &self,
        wallet: &dyn WalletProvider,
        media: &dyn MediaContract,
        address: Address,
    ) -> Result<Vec<Token>, MarketError> {
        let latest = wallet.latest_block().await?;

        // 1. 分页扫描 Transfer 事件，收集候选代币
        let mut records: Vec<TransferRecord> = Vec::new();
        let mut from_block = 0u64;
        let mut pages = 0u64;

        loop {
            let to_block = from_block.saturating_add(self.page_size - 1).min(latest);

            let page = media.transfers_to(address, from_block, to_block).await?;
            records.extend(page);
            pages += 1;

            if to_block == latest {
                break;
            }
            from_block = to_block + 1;
        }

        metrics::add_scan_pages(pages);

        let candidates = dedup_candidates(records.iter().map(|r| r.token_id));

        tracing::debug!(
            address = %address,
            pages,
            candidates = candidates.len(),
            latest_block = latest,
            "Transfer scan complete"
        );

        // 2. 有界并发校验当前所有权并取元数据，保持候选顺序
        let verified: Vec<Option<Token>> = stream::iter(candidates)
            .map(|token_id| async move {
                metrics::inc_ownership_verify();

                let owner = media.owner_of(token_id).await?;
                if owner != address {
                    return Ok::<Option<Token>, MarketError>(None);
                }

                let meta = media.token_meta(token_id).await?;
                Ok(Some(Token::from(meta)))
            })
            .buffered(self.verify_concurrency)
            .try_collect()
            .await?;

        Ok(verified.into_iter().flatten().collect())
    }
}

/// 候选代币去重：以代币 id 为键，保持首次出现的顺序
pub fn dedup_candidates(token_ids: impl IntoIterator<Item = U256>) -> Vec<U256> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in token_ids {
        if seen.insert(id) {
            out.push(id);
        }
    }
    out
}
