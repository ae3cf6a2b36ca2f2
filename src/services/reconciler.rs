//! 重复检测
//!
//! 先查本地缓存，未命中再按题号查询远程数据库。缓存命中时立即返回 Found，
//! 同时在后台核实远程页面是否仍然存在。整个流程尽力而为：任何远程错误都只
//! 记录日志并降级为 NotFound，不会阻塞保存。

use super::cache::VolatileCache;
use super::notion::NotionApi;
use super::schema::{fetch_schema, fields, resolve_field};
use crate::error::SyncError;
use crate::models::{CacheEntry, PageRef};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// 重复检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DuplicateStatus {
    /// 没有题号，无法判断
    Unknown,
    #[serde(rename_all = "camelCase")]
    Found { page_id: String, page_url: String },
    NotFound,
}

impl DuplicateStatus {
    pub fn is_found(&self) -> bool {
        matches!(self, DuplicateStatus::Found { .. })
    }

    fn from_entry(entry: &CacheEntry) -> Self {
        DuplicateStatus::Found {
            page_id: entry.page_id.clone(),
            page_url: entry.page_url.clone(),
        }
    }
}

/// 后台核实任务；完成后给出最终状态
pub struct BackgroundVerification {
    handle: JoinHandle<DuplicateStatus>,
    optimistic: DuplicateStatus,
}

impl BackgroundVerification {
    /// 等待核实完成；任务本身异常时保持乐观状态
    pub async fn settled(self) -> DuplicateStatus {
        match self.handle.await {
            Ok(status) => status,
            Err(e) => {
                warn!("Background verification task failed: {}", e);
                self.optimistic
            }
        }
    }
}

/// 一次重复检测的输出：立即可渲染的状态，加上可选的后台核实
pub struct DuplicateCheck {
    pub status: DuplicateStatus,
    pub verification: Option<BackgroundVerification>,
}

impl DuplicateCheck {
    pub fn ready(status: DuplicateStatus) -> Self {
        Self {
            status,
            verification: None,
        }
    }

    /// 等后台核实结束后的最终状态
    pub async fn resolve(self) -> DuplicateStatus {
        match self.verification {
            Some(verification) => verification.settled().await,
            None => self.status,
        }
    }
}

#[derive(Clone)]
pub struct DuplicateReconciler {
    api: Arc<dyn NotionApi>,
    cache: VolatileCache,
    database_id: String,
}

impl DuplicateReconciler {
    pub fn new(api: Arc<dyn NotionApi>, cache: VolatileCache, database_id: impl Into<String>) -> Self {
        Self {
            api,
            cache,
            database_id: database_id.into(),
        }
    }

    /// 检查题号对应的记录是否已存在于远程
    pub async fn check(&self, number: Option<u32>) -> DuplicateCheck {
        let Some(number) = number else {
            return DuplicateCheck::ready(DuplicateStatus::Unknown);
        };

        if let Some(entry) = self.cache.get(number) {
            debug!("Cache hit for problem {} -> {}", number, entry.page_id);
            let optimistic = DuplicateStatus::from_entry(&entry);
            let handle = tokio::spawn(Self::verify(
                self.api.clone(),
                self.cache.clone(),
                number,
                entry,
            ));
            return DuplicateCheck {
                status: optimistic.clone(),
                verification: Some(BackgroundVerification { handle, optimistic }),
            };
        }

        let status = match self.query_remote(number).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Duplicate lookup for problem {} failed: {}", number, e);
                DuplicateStatus::NotFound
            }
        };
        DuplicateCheck::ready(status)
    }

    async fn query_remote(&self, number: u32) -> Result<DuplicateStatus, SyncError> {
        let schema = fetch_schema(self.api.as_ref(), &self.database_id).await?;
        let property = resolve_field(&schema, fields::NUMBER)
            .ok_or_else(|| SyncError::schema("no number property"))?;

        let pages = self
            .api
            .query_by_number(&self.database_id, &property.name, number)
            .await?;

        match pages.into_iter().find(PageRef::is_live) {
            Some(page) => {
                if let Err(e) = self.cache.put_page(number, &page) {
                    warn!("Failed to cache page for problem {}: {}", number, e);
                }
                Ok(DuplicateStatus::Found {
                    page_id: page.id,
                    page_url: page.url,
                })
            }
            None => Ok(DuplicateStatus::NotFound),
        }
    }

    /// 后台核实：远程页面已删除、归档或进回收站时清掉缓存
    async fn verify(
        api: Arc<dyn NotionApi>,
        cache: VolatileCache,
        number: u32,
        entry: CacheEntry,
    ) -> DuplicateStatus {
        match api.retrieve_page(&entry.page_id).await {
            Ok(Some(page)) if page.is_live() => DuplicateStatus::from_entry(&entry),
            Ok(_) => {
                info!("Cached page {} for problem {} is gone, evicting", entry.page_id, number);
                cache.invalidate(number);
                DuplicateStatus::NotFound
            }
            Err(e) => {
                // 网络错误不影响状态，缓存会自然过期
                warn!("Verification of page {} failed: {}", entry.page_id, e);
                DuplicateStatus::from_entry(&entry)
            }
        }
    }

    /// 保存成功后：NotFound → Found，并写入缓存
    pub fn record_saved(&self, number: Option<u32>, page: &PageRef) -> DuplicateStatus {
        if let Some(number) = number {
            if let Err(e) = self.cache.put_page(number, page) {
                warn!("Failed to cache saved page for problem {}: {}", number, e);
            }
        }
        DuplicateStatus::Found {
            page_id: page.id.clone(),
            page_url: page.url.clone(),
        }
    }
}
