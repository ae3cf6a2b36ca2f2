//! 凭据设置与格式校验
//!
//! 校验在任何网络请求之前完成。

use super::store::Store;
use crate::error::SyncError;
use serde::{Deserialize, Serialize};

pub const TOKEN_KEY: &str = "notionToken";
pub const DATABASE_ID_KEY: &str = "notionDatabaseId";
pub const SAVE_HOST_KEY: &str = "saveHost";

/// 可接受的令牌前缀
pub const TOKEN_PREFIXES: &[&str] = &["secret_", "ntn_"];

/// 保存时使用的题目链接域名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveHost {
    /// 保持用户实际做题的站点
    #[default]
    Original,
    Com,
    Cn,
}

impl SaveHost {
    pub fn parse(value: &str) -> Result<Self, SyncError> {
        match value.trim().to_lowercase().as_str() {
            "original" | "" => Ok(SaveHost::Original),
            "com" | "leetcode.com" => Ok(SaveHost::Com),
            "cn" | "leetcode.cn" => Ok(SaveHost::Cn),
            other => Err(SyncError::validation(format!("Unknown save host '{}'", other))),
        }
    }

    pub fn apply(&self, url: &str) -> String {
        match self {
            SaveHost::Original => url.to_string(),
            SaveHost::Com => url.replacen("leetcode.cn", "leetcode.com", 1),
            SaveHost::Cn => url.replacen("leetcode.com", "leetcode.cn", 1),
        }
    }
}

pub fn validate_token(token: &str) -> Result<String, SyncError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(SyncError::validation("Notion token is empty"));
    }
    if !TOKEN_PREFIXES.iter().any(|prefix| token.starts_with(prefix)) {
        return Err(SyncError::validation(format!(
            "Notion token must start with one of: {}",
            TOKEN_PREFIXES.join(", ")
        )));
    }
    Ok(token.to_string())
}

/// 去掉连字符后必须是 32 位十六进制
pub fn normalize_database_id(database_id: &str) -> Result<String, SyncError> {
    let compact: String = database_id.trim().chars().filter(|c| *c != '-').collect();
    if compact.len() != 32 || !compact.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SyncError::validation(
            "Database ID must be 32 hexadecimal characters (hyphens optional)",
        ));
    }
    Ok(compact.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotionSettings {
    pub token: Option<String>,
    pub database_id: Option<String>,
    pub save_host: SaveHost,
}

impl NotionSettings {
    pub fn load(store: &Store) -> Result<Self, SyncError> {
        Ok(Self {
            token: store.get(TOKEN_KEY)?,
            database_id: store.get(DATABASE_ID_KEY)?,
            save_host: store.get(SAVE_HOST_KEY)?.unwrap_or_default(),
        })
    }

    /// 校验后写入；原始字段按原样保存
    pub fn save(store: &Store, token: &str, database_id: &str, save_host: SaveHost) -> Result<Self, SyncError> {
        let token = validate_token(token)?;
        let database_id = normalize_database_id(database_id)?;
        store.put(TOKEN_KEY, &token)?;
        store.put(DATABASE_ID_KEY, &database_id)?;
        store.put(SAVE_HOST_KEY, &save_host)?;
        Ok(Self {
            token: Some(token),
            database_id: Some(database_id),
            save_host,
        })
    }

    /// 取出可用的凭据；缺失或格式不对时返回校验错误
    pub fn credentials(&self) -> Result<(String, String), SyncError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| SyncError::validation("Notion token is not configured"))?;
        let database_id = self
            .database_id
            .as_deref()
            .ok_or_else(|| SyncError::validation("Notion database ID is not configured"))?;
        Ok((validate_token(token)?, normalize_database_id(database_id)?))
    }
}
