//! 网络配置模块
//!
//! 定义所有支持的网络及 chain id 到网络名的映射

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 网络配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// 链 ID (EIP-155)
    pub chain_id: u64,
    /// 网络名称（部署表的键）
    pub name: String,
    /// 原生币符号
    pub native_symbol: String,
    /// 是否为测试网/本地网
    pub is_testnet: bool,
}

/// 网络注册表
pub struct NetworkRegistry {
    configs: HashMap<u64, NetworkConfig>,
    name_map: HashMap<String, u64>,
}

impl NetworkRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            configs: HashMap::new(),
            name_map: HashMap::new(),
        };

        registry.register_default_networks();
        registry
    }

    /// 注册默认支持的网络（与部署元数据的网络名一一对应）
    fn register_default_networks(&mut self) {
        self.register(NetworkConfig {
            chain_id: 1,
            name: "mainnet".to_string(),
            native_symbol: "ETH".to_string(),
            is_testnet: false,
        });

        self.register(NetworkConfig {
            chain_id: 4,
            name: "rinkeby".to_string(),
            native_symbol: "ETH".to_string(),
            is_testnet: true,
        });

        self.register(NetworkConfig {
            chain_id: 137,
            name: "polygon".to_string(),
            native_symbol: "MATIC".to_string(),
            is_testnet: false,
        });

        self.register(NetworkConfig {
            chain_id: 80001,
            name: "polygonMumbai".to_string(),
            native_symbol: "MATIC".to_string(),
            is_testnet: true,
        });

        // 本地开发链：注册网络名但默认不携带部署记录
        self.register(NetworkConfig {
            chain_id: 31337,
            name: "hardhat".to_string(),
            native_symbol: "ETH".to_string(),
            is_testnet: true,
        });
    }

    /// 注册网络配置
    pub fn register(&mut self, config: NetworkConfig) {
        let chain_id = config.chain_id;
        self.name_map.insert(config.name.clone(), chain_id);
        self.configs.insert(chain_id, config);
    }

    /// 通过 chain_id 获取配置
    pub fn get_by_chain_id(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.configs.get(&chain_id)
    }

    /// 通过网络名获取配置
    pub fn get_by_name(&self, name: &str) -> Option<&NetworkConfig> {
        let chain_id = self.name_map.get(name)?;
        self.configs.get(chain_id)
    }

    /// chain id → 网络名
    pub fn network_name_for(&self, chain_id: u64) -> Option<&str> {
        self.configs.get(&chain_id).map(|c| c.name.as_str())
    }

    /// 列出所有支持的网络
    pub fn list_all(&self) -> Vec<&NetworkConfig> {
        self.configs.values().collect()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
