//! 会话对象
//!
//! 每次打开弹窗时重新构建，不持有模块级状态；跨会话的数据全部经由本地存储。

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::models::{ExtractOptions, ProblemRecord};
use crate::services::extractor::{PageCache, PageFieldExtractor, PageSnapshot};
use crate::services::{
    DuplicateReconciler, NotionApi, NotionClient, NotionSettings, RecordWriter, SaveHost, Store,
    TimerService, VolatileCache,
};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

pub struct Session {
    config: AppConfig,
    store: Store,
    extractor: PageFieldExtractor,
    page_cache: Mutex<PageCache>,
    api_override: Option<Arc<dyn NotionApi>>,
}

/// 已通过凭据校验的远程目标
#[derive(Clone)]
pub struct RemoteTarget {
    pub api: Arc<dyn NotionApi>,
    pub database_id: String,
    pub save_host: SaveHost,
}

impl RemoteTarget {
    pub fn reconciler(&self, cache: VolatileCache) -> DuplicateReconciler {
        DuplicateReconciler::new(self.api.clone(), cache, self.database_id.clone())
    }

    pub fn writer(&self) -> RecordWriter {
        RecordWriter::new(self.api.clone(), self.database_id.clone())
    }
}

impl Session {
    /// 打开数据目录下的本地存储
    pub fn open(config: AppConfig) -> Result<Self, SyncError> {
        let store = Store::open(&config.database_path())?;
        Self::build(config, store, None)
    }

    /// 使用给定的远程实现（测试或嵌入场景）
    pub fn with_api(store: Store, api: Arc<dyn NotionApi>) -> Result<Self, SyncError> {
        Self::build(AppConfig::default(), store, Some(api))
    }

    fn build(config: AppConfig, store: Store, api_override: Option<Arc<dyn NotionApi>>) -> Result<Self, SyncError> {
        Ok(Self {
            config,
            store,
            extractor: PageFieldExtractor::new()?,
            page_cache: Mutex::new(PageCache::default()),
            api_override,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> Result<NotionSettings, SyncError> {
        NotionSettings::load(&self.store)
    }

    pub fn cache(&self) -> VolatileCache {
        VolatileCache::new(self.store.clone())
    }

    pub fn timer(&self) -> TimerService {
        TimerService::new(self.store.clone())
    }

    pub fn extract(
        &self,
        page: &PageSnapshot,
        options: &ExtractOptions,
        now: DateTime<Utc>,
    ) -> Result<ProblemRecord, SyncError> {
        let mut cache = self.page_cache.lock().map_err(|_| SyncError::StoreUnavailable)?;
        self.extractor.extract_cached(&mut cache, page, options, now)
    }

    /// 凭据校验通过后才创建远程客户端
    pub fn connect(&self) -> Result<RemoteTarget, SyncError> {
        let settings = self.settings()?;
        let (token, database_id) = settings.credentials()?;
        let api: Arc<dyn NotionApi> = match &self.api_override {
            Some(api) => api.clone(),
            None => Arc::new(NotionClient::new(&self.config, token)?),
        };
        Ok(RemoteTarget {
            api,
            database_id,
            save_host: settings.save_host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNotion;

    #[test]
    fn test_connect_requires_credentials() {
        let store = Store::open_in_memory().unwrap();
        let fake = Arc::new(FakeNotion::default());
        let session = Session::with_api(store.clone(), fake.clone()).unwrap();
        assert!(matches!(session.connect(), Err(SyncError::Validation(_))));

        NotionSettings::save(&store, "ntn_test", "0123456789abcdef0123456789abcdef", SaveHost::Com).unwrap();
        let target = session.connect().unwrap();
        assert_eq!(target.database_id, "0123456789abcdef0123456789abcdef");
        assert_eq!(target.save_host, SaveHost::Com);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().join("data"),
            ..AppConfig::default()
        };
        let session = Session::open(config.clone()).unwrap();
        session.store().put_raw("k", "\"v\"").unwrap();
        assert!(config.database_path().exists());
    }
}
