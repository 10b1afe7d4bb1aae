//! 日志系统配置模块
//! 支持结构化日志与日志级别配置

use std::path::Path;

use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 初始化日志系统
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    // 设置日志级别过滤器
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        init_json_logging(filter, config)?;
    } else {
        init_text_logging(filter, config)?;
    }

    Ok(())
}

/// 初始化JSON格式日志（结构化日志）
fn init_json_logging(
    filter: EnvFilter,
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.enable_file_logging {
        let log_dir = config
            .log_file_path
            .as_ref()
            .and_then(|p| Path::new(p).parent())
            .unwrap_or_else(|| Path::new("./logs"));

        std::fs::create_dir_all(log_dir)?;

        let file_appender = rolling::daily(log_dir, "zoocore.log");
        let (non_blocking_appender, _guard) = non_blocking(file_appender);

        let file_layer = fmt::layer()
            .json()
            .with_writer(non_blocking_appender)
            .with_timer(ChronoUtc::rfc_3339());

        let stdout_layer = fmt::layer().json().with_timer(ChronoUtc::rfc_3339());

        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(stdout_layer)
            .init();
    } else {
        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .init();
    }

    Ok(())
}

/// 初始化文本格式日志
fn init_text_logging(
    filter: EnvFilter,
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if config.enable_file_logging {
        let log_dir = config
            .log_file_path
            .as_ref()
            .and_then(|p| Path::new(p).parent())
            .unwrap_or_else(|| Path::new("./logs"));

        std::fs::create_dir_all(log_dir)?;

        let file_appender = rolling::daily(log_dir, "zoocore.log");
        let (non_blocking_appender, _guard) = non_blocking(file_appender);

        let file_layer = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false);

        let stdout_layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true);

        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(stdout_layer)
            .init();
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .init();
    }

    Ok(())
}

/// 简化初始化（使用默认配置）
pub fn init_default_logging() {
    let config = LoggingConfig::default();
    init_logging(&config).unwrap_or_else(|e| {
        eprintln!("Failed to initialize logging: {}", e);
        // 回退到最基本的日志初始化
        tracing_subscriber::fmt::init();
    });
}
