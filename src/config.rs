//! 应用配置
//! 默认值加环境变量覆盖

use crate::utils;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// 运行配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_level: log::LevelFilter,
    pub log_to_file: bool,
    pub api_base_url: String,
    pub api_version: String,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: utils::get_app_data_dir(),
            log_level: log::LevelFilter::Info,
            log_to_file: true,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    /// 读取 `LEETNOTE_*` 环境变量覆盖默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("LEETNOTE_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("LEETNOTE_LOG").and_then(|v| v.parse().ok()) {
            config.log_level = level;
        }
        if let Some(base) = lookup("LEETNOTE_API_BASE").filter(|v| !v.trim().is_empty()) {
            config.api_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("LEETNOTE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn database_path(&self) -> PathBuf {
        utils::get_database_path(&self.data_dir)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_to_file.then(|| utils::get_log_path(&self.data_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LEETNOTE_DATA_DIR", "/tmp/ln"),
            ("LEETNOTE_LOG", "debug"),
            ("LEETNOTE_API_BASE", "http://localhost:9000/v1/"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ln"));
        assert_eq!(config.log_level, log::LevelFilter::Debug);
        assert_eq!(config.api_base_url, "http://localhost:9000/v1");
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/ln/leetnote.db"));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = AppConfig::from_lookup(|key| match key {
            "LEETNOTE_LOG" => Some("loud".to_string()),
            "LEETNOTE_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.log_level, log::LevelFilter::Info);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
