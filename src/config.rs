//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub wallet: WalletConfig,
    pub registry: RegistryConfig,
    pub scan: ScanConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
    /// 部署元数据：网络名 → 合约名 → 部署记录
    #[serde(default)]
    pub deployments: HashMap<String, HashMap<String, DeploymentRecord>>,
    /// 拍卖行合约地址：网络名 → 地址
    #[serde(default)]
    pub auction_house: HashMap<String, String>,
}

/// 钱包/节点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub rpc_url: String,
    /// 签名私钥（hex，不带0x前缀也可）
    pub signer_key: String,
    pub chain_id: u64,
}

/// 用户注册服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// 事件扫描配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// 单页区块跨度（Transfer日志分页扫描）
    pub page_size: u64,
    /// ownerOf 校验的并发上限
    pub verify_concurrency: usize,
}

/// 同步守护进程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub listing_refresh_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// 单个合约的部署记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub address: String,
    pub abi_version: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("ZOO_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".into()),
            signer_key: std::env::var("ZOO_SIGNER_KEY").unwrap_or_default(),
            chain_id: std::env::var("ZOO_CHAIN_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("ZOO_REGISTRY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".into()),
            timeout_secs: std::env::var("ZOO_REGISTRY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: std::env::var("ZOO_SCAN_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50_000),
            verify_concurrency: std::env::var("ZOO_SCAN_VERIFY_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            listing_refresh_secs: std::env::var("ZOO_LISTING_REFRESH_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

/// 默认部署表：主网 ZooMedia（与前端使用的地址一致）
fn default_deployments() -> HashMap<String, HashMap<String, DeploymentRecord>> {
    let mut mainnet = HashMap::new();
    mainnet.insert(
        "ZooMedia".to_string(),
        DeploymentRecord {
            address: std::env::var("ZOO_MEDIA_ADDR_MAINNET")
                .unwrap_or_else(|_| "0x8e7788ee2b1d3e5451e182035d6b2b566c2fe997".into()),
            abi_version: "1".to_string(),
        },
    );

    let mut table = HashMap::new();
    table.insert("mainnet".to_string(), mainnet);
    table
}

fn default_auction_house() -> HashMap<String, String> {
    // 原则上每个网络一个固定地址，未配置的网络在构造客户端时报配置错误
    let mut table = HashMap::new();
    for (network, env_key) in [
        ("mainnet", "ZOO_AUCTION_HOUSE_ADDR_MAINNET"),
        ("rinkeby", "ZOO_AUCTION_HOUSE_ADDR_RINKEBY"),
        ("polygon", "ZOO_AUCTION_HOUSE_ADDR_POLYGON"),
        ("polygonMumbai", "ZOO_AUCTION_HOUSE_ADDR_MUMBAI"),
    ] {
        if let Ok(addr) = std::env::var(env_key) {
            table.insert(network.to_string(), addr);
        }
    }
    table
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            wallet: WalletConfig::default(),
            registry: RegistryConfig::default(),
            scan: ScanConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
            deployments: default_deployments(),
            auction_house: default_auction_house(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                let file_config = Self::from_file(path)?;
                config = file_config;
            }
        }

        Ok(config)
    }

    /// 查找部署记录
    pub fn deployment(&self, network: &str, contract: &str) -> Option<&DeploymentRecord> {
        self.deployments.get(network)?.get(contract)
    }

    /// 查找拍卖行地址
    pub fn auction_house_address(&self, network: &str) -> Option<&str> {
        self.auction_house.get(network).map(|s| s.as_str())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.wallet.rpc_url.starts_with("http://") && !self.wallet.rpc_url.starts_with("https://")
        {
            anyhow::bail!("ZOO_RPC_URL must start with http:// or https://");
        }

        if self.scan.page_size == 0 {
            anyhow::bail!("ZOO_SCAN_PAGE_SIZE must be greater than 0");
        }
        if self.scan.verify_concurrency == 0 {
            anyhow::bail!("ZOO_SCAN_VERIFY_CONCURRENCY must be greater than 0");
        }

        // 部署地址必须是合法的十六进制地址
        for (network, contracts) in &self.deployments {
            for (name, record) in contracts {
                let hex_part = record.address.trim_start_matches("0x");
                if hex_part.len() != 40 || hex::decode(hex_part).is_err() {
                    anyhow::bail!(
                        "Invalid deployment address for {}/{}: {}",
                        network,
                        name,
                        record.address
                    );
                }
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
