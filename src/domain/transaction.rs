//! 交易追踪模型
//!
//! 每笔提交的交易以提交ID为键单独追踪，各自拥有独立的确认生命周期。
//! 提交新交易不会丢弃对旧交易的追踪。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ethers::types::H256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 交易类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Purchase,
    SaleToggle,
    Transfer,
}

/// 交易确认生命周期
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TxStatus {
    /// 已提交，尚未打包
    Submitted,
    /// 已确认
    Confirmed { block_number: u64 },
    /// 已打包但执行回滚
    Failed,
}

/// 单笔被追踪的交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTransaction {
    pub submission_id: Uuid,
    pub tx_hash: H256,
    pub kind: TxKind,
    pub status: TxStatus,
    pub submitted_at: DateTime<Utc>,
}

/// 以提交ID为键的交易集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    entries: HashMap<Uuid, TrackedTransaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一笔新提交的交易，返回提交ID
    pub fn record(&mut self, tx_hash: H256, kind: TxKind) -> Uuid {
        let submission_id = Uuid::new_v4();
        self.entries.insert(
            submission_id,
            TrackedTransaction {
                submission_id,
                tx_hash,
                kind,
                status: TxStatus::Submitted,
                submitted_at: Utc::now(),
            },
        );
        submission_id
    }

    pub fn get(&self, submission_id: &Uuid) -> Option<&TrackedTransaction> {
        self.entries.get(submission_id)
    }

    /// 推进某笔交易的生命周期
    pub fn update_status(&mut self, submission_id: &Uuid, status: TxStatus) -> bool {
        match self.entries.get_mut(submission_id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 仍在等待确认的交易
    pub fn pending(&self) -> Vec<&TrackedTransaction> {
        self.entries
            .values()
            .filter(|t| t.status == TxStatus::Submitted)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_every_submission() {
        let mut log = TransactionLog::new();
        let a = log.record(H256::repeat_byte(0x11), TxKind::Purchase);
        let b = log.record(H256::repeat_byte(0x22), TxKind::Transfer);

        assert_ne!(a, b);
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(&a).unwrap().tx_hash, H256::repeat_byte(0x11));
        assert_eq!(log.get(&b).unwrap().kind, TxKind::Transfer);
    }

    #[test]
    fn test_lifecycle_update() {
        let mut log = TransactionLog::new();
        let id = log.record(H256::repeat_byte(0x33), TxKind::SaleToggle);

        assert_eq!(log.pending().len(), 1);
        assert!(log.update_status(&id, TxStatus::Confirmed { block_number: 42 }));
        assert!(log.pending().is_empty());
        assert_eq!(
            log.get(&id).unwrap().status,
            TxStatus::Confirmed { block_number: 42 }
        );
    }

    #[test]
    fn test_update_unknown_submission() {
        let mut log = TransactionLog::new();
        assert!(!log.update_status(&Uuid::new_v4(), TxStatus::Failed));
    }
}
