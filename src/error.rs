//! 统一错误类型
//!
//! 错误分类（贯穿整个状态同步层）：
//! - Configuration: 网络不支持、部署记录缺失等配置问题
//! - Precondition: 在合约/用户就绪之前调用了依赖它们的操作
//! - RemoteCall: 钱包或合约RPC层的任何失败

use ethers::providers::ProviderError;
use thiserror::Error;

/// 稳定错误码（用于日志与指标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketErrorCode {
    Configuration,
    Precondition,
    RemoteCall,
}

#[derive(Debug, Error)]
pub enum MarketError {
    /// 配置错误：不支持的网络、缺失的部署记录、非法地址等
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 前置条件未满足：操作在所需状态（合约绑定/用户）建立之前被调用
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// 远程调用失败：钱包或合约RPC层返回的任何错误
    #[error("remote call failed: {0}")]
    RemoteCall(String),
}

impl MarketError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn remote(err: impl std::fmt::Display) -> Self {
        Self::RemoteCall(err.to_string())
    }

    pub fn code(&self) -> MarketErrorCode {
        match self {
            Self::Configuration(_) => MarketErrorCode::Configuration,
            Self::Precondition(_) => MarketErrorCode::Precondition,
            Self::RemoteCall(_) => MarketErrorCode::RemoteCall,
        }
    }

    /// 稳定错误码字符串
    pub fn code_str(&self) -> &'static str {
        match self.code() {
            MarketErrorCode::Configuration => "configuration_error",
            MarketErrorCode::Precondition => "precondition_error",
            MarketErrorCode::RemoteCall => "remote_call_error",
        }
    }
}

impl From<ProviderError> for MarketError {
    fn from(err: ProviderError) -> Self {
        Self::RemoteCall(err.to_string())
    }
}

impl From<reqwest::Error> for MarketError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteCall(format!("registry request failed: {}", err))
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(format!("JSON parse error: {}", err))
    }
}
