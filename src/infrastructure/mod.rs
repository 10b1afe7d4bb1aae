//! 基础设施层：日志、钱包连接、合约句柄

pub mod contracts;
pub mod logging;
pub mod wallet;
