//! 用户注册服务客户端
//!
//! 仅在钱包登录期间使用：先查已有记录，没有则注册。
//! 注册服务是外部协作方，这里只做简单的请求/响应封装。

use ethers::{types::Address, utils::to_checksum};
use serde::{Deserialize, Serialize};

use crate::{config::RegistryConfig, error::MarketError};

/// 注册服务返回的用户记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    /// 钱包地址（注册时的 mmid）
    pub mmid: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: Option<RegisteredUser>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest {
    mmid: String,
}

pub struct RegistryClient {
    base_url: String,
    client: reqwest::Client,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                MarketError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `GET /users/:address`；记录不存在时返回 None
    pub async fn fetch_user(&self, address: Address) -> Result<Option<RegisteredUser>, MarketError> {
        let url = format!("{}/users/{}", self.base_url, to_checksum(&address, None));

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::remote(format!(
                "registry returned {} for {}",
                status, url
            )));
        }

        let envelope: UserEnvelope = response.json().await?;
        Ok(envelope.user)
    }

    /// `POST /users/registermm`
    pub async fn register(&self, address: Address) -> Result<RegisteredUser, MarketError> {
        let url = format!("{}/users/registermm", self.base_url);
        let body = RegisterRequest {
            mmid: to_checksum(&address, None),
        };

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::remote(format!(
                "registry registration failed: {}",
                status
            )));
        }

        let envelope: UserEnvelope = response.json().await?;
        let user = envelope
            .user
            .ok_or_else(|| MarketError::remote("registry returned no user record"))?;

        tracing::info!(mmid = %user.mmid, "user registered");
        Ok(user)
    }
}
