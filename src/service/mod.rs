//! 服务层：状态存储、所有权解析、拍卖行SDK、注册服务客户端

pub mod auction_house;
pub mod market_store;
pub mod ownership;
pub mod registry_client;
