//! 题目相关命令
//! 提取、重复检测、保存与复习标记更新

use super::session::Session;
use crate::error::SyncError;
use crate::models::{ExtractOptions, ExtractResponse, ReviewFlags, SaveRequest};
use crate::services::extractor::PageSnapshot;
use crate::services::{fetch_schema, DuplicateCheck, DuplicateStatus};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// 保存结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub page_id: String,
    pub page_url: String,
    pub status: DuplicateStatus,
}

/// 提取当前页面的题目信息
pub fn extract_problem(session: &Session, page: &PageSnapshot, options: &ExtractOptions) -> ExtractResponse {
    match session.extract(page, options, Utc::now()) {
        Ok(record) => ExtractResponse::ok(record),
        Err(e) => {
            warn!("Extraction failed for {}: {}", page.url, e);
            ExtractResponse::failed(e.user_message())
        }
    }
}

/// 检查是否已保存过；任何错误都降级为 NotFound
pub async fn check_duplicate(session: &Session, number: Option<u32>) -> DuplicateCheck {
    if number.is_none() {
        return DuplicateCheck::ready(DuplicateStatus::Unknown);
    }
    match session.connect() {
        Ok(target) => target.reconciler(session.cache()).check(number).await,
        Err(e) => {
            warn!("Skipping duplicate check: {}", e);
            DuplicateCheck::ready(DuplicateStatus::NotFound)
        }
    }
}

/// 创建远程记录；失败时不写缓存
pub async fn save_problem(session: &Session, request: SaveRequest) -> Result<SaveOutcome, String> {
    save(session, request).await.map_err(|e| {
        warn!("Save failed: {}", e);
        e.user_message()
    })
}

async fn save(session: &Session, mut request: SaveRequest) -> Result<SaveOutcome, SyncError> {
    let target = session.connect()?;
    request.problem.url = target.save_host.apply(&request.problem.url);

    let schema = fetch_schema(target.api.as_ref(), &target.database_id).await?;
    let page = target.writer().create(&request, &schema).await?;
    let status = target
        .reconciler(session.cache())
        .record_saved(request.problem.number, &page);

    Ok(SaveOutcome {
        page_id: page.id,
        page_url: page.url,
        status,
    })
}

/// 更新已有记录的两个勾选字段
pub async fn update_flags(session: &Session, page_id: &str, flags: ReviewFlags) -> Result<(), String> {
    patch_flags(session, page_id, flags).await.map_err(|e| {
        warn!("Updating flags on {} failed: {}", page_id, e);
        e.user_message()
    })?;
    info!("Flags updated on {}", page_id);
    Ok(())
}

async fn patch_flags(session: &Session, page_id: &str, flags: ReviewFlags) -> Result<(), SyncError> {
    let target = session.connect()?;
    let schema = fetch_schema(target.api.as_ref(), &target.database_id).await?;
    target.writer().update(page_id, &flags, &schema).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyType;
    use crate::services::{NotionSettings, SaveHost, Store};
    use crate::testing::FakeNotion;
    use std::sync::Arc;

    const DB_ID: &str = "0123456789abcdef0123456789abcdef";
    const PAGE_HTML: &str =
        r#"<div class="text-title-large">1. 两数之和</div><div class="text-difficulty-easy">简单</div>"#;
    const PAGE_URL: &str = "https://leetcode.com/problems/two-sum/";

    fn configured(fake: Arc<FakeNotion>, host: SaveHost) -> (Session, Store) {
        let store = Store::open_in_memory().unwrap();
        NotionSettings::save(&store, "secret_test", DB_ID, host).unwrap();
        (Session::with_api(store.clone(), fake).unwrap(), store)
    }

    fn full_schema() -> FakeNotion {
        FakeNotion::with_schema(&[
            ("Name", PropertyType::Title),
            ("No.", PropertyType::Number),
            ("Link", PropertyType::Url),
            ("Needed Hint", PropertyType::Checkbox),
            ("Can Redo", PropertyType::Checkbox),
        ])
    }

    fn extracted(session: &Session) -> SaveRequest {
        let response = extract_problem(session, &PageSnapshot::new(PAGE_URL, PAGE_HTML), &ExtractOptions::default());
        assert!(response.success);
        SaveRequest::new(response.data.unwrap())
    }

    #[test]
    fn test_extract_failure_is_reported() {
        let (session, _) = configured(Arc::new(FakeNotion::default()), SaveHost::Original);
        let response = extract_problem(
            &session,
            &PageSnapshot::new("https://example.com/", "<html></html>"),
            &ExtractOptions::default(),
        );
        assert!(!response.success);
        assert!(response.error.unwrap().contains("reload"));
    }

    #[tokio::test]
    async fn test_save_then_check_hits_cache() {
        let fake = Arc::new(full_schema());
        let (session, store) = configured(fake.clone(), SaveHost::Cn);

        let request = extracted(&session);
        assert_eq!(request.problem.number, Some(1));
        let outcome = save_problem(&session, request).await.unwrap();
        assert!(outcome.status.is_found());
        assert!(store.contains("problem_1").unwrap());

        let created = fake.created();
        assert_eq!(
            created[0]["properties"]["Link"]["url"],
            "https://leetcode.cn/problems/two-sum/"
        );

        let check = check_duplicate(&session, Some(1)).await;
        assert_eq!(check.status.clone(), outcome.status);
        assert_eq!(check.resolve().await, outcome.status);
    }

    #[tokio::test]
    async fn test_failed_save_writes_no_cache() {
        let fake = Arc::new(FakeNotion::with_schema(&[("No.", PropertyType::Number)]));
        let (session, store) = configured(fake.clone(), SaveHost::Original);

        let error = save_problem(&session, extracted(&session)).await.unwrap_err();
        assert!(error.contains("title"));
        assert!(!store.contains("problem_1").unwrap());
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_create_writes_no_cache() {
        let fake = Arc::new(full_schema());
        fake.reject_creates(400, "body failed validation");
        let (session, store) = configured(fake.clone(), SaveHost::Original);

        let error = save_problem(&session, extracted(&session)).await.unwrap_err();
        assert_eq!(error, "body failed validation");
        assert!(fake.calls().contains(&"POST /pages".to_string()));
        assert!(fake.created().is_empty());
        assert!(!store.contains("problem_1").unwrap());
        assert_eq!(check_duplicate(&session, Some(1)).await.status, DuplicateStatus::NotFound);
    }

    #[tokio::test]
    async fn test_network_error_surfaces_on_save_but_not_on_check() {
        let fake = Arc::new(full_schema());
        fake.fail_network();
        let (session, _) = configured(fake, SaveHost::Original);

        assert_eq!(check_duplicate(&session, Some(1)).await.status, DuplicateStatus::NotFound);
        let error = save_problem(&session, extracted(&session)).await.unwrap_err();
        assert_eq!(error, "connection refused");
    }

    #[tokio::test]
    async fn test_unconfigured_session() {
        let fake = Arc::new(full_schema());
        let session = Session::with_api(Store::open_in_memory().unwrap(), fake.clone()).unwrap();

        assert_eq!(check_duplicate(&session, None).await.status, DuplicateStatus::Unknown);
        assert_eq!(check_duplicate(&session, Some(7)).await.status, DuplicateStatus::NotFound);
        assert!(save_problem(&session, extracted(&session)).await.is_err());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_flags() {
        let fake = Arc::new(full_schema());
        let (session, _) = configured(fake.clone(), SaveHost::Original);
        let flags = ReviewFlags {
            hint_needed: true,
            can_redo: false,
        };

        update_flags(&session, "page-9", flags).await.unwrap();
        let (page_id, properties) = fake.updated().remove(0);
        assert_eq!(page_id, "page-9");
        assert_eq!(properties["Needed Hint"]["checkbox"], true);
        assert_eq!(properties["Can Redo"]["checkbox"], false);
    }
}
