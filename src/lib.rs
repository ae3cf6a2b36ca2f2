//! leetnote: 把刷题页面的题目信息同步到 Notion 数据库
//!
//! 提取题目字段，按题号去重，按用户数据库的列名和类型写入记录，并在本地维护计时。

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod testing;

pub use commands::Session;
pub use config::AppConfig;
pub use error::SyncError;
pub use models::{Difficulty, ProblemRecord, SaveRequest};
