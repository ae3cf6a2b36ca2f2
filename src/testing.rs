//! 测试用内存 Notion 实现

use crate::error::SyncError;
use crate::models::{PageRef, PropertyType};
use crate::services::notion::{create_page_body, NotionApi};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    database: Value,
    query_results: Vec<PageRef>,
    pages: HashMap<String, PageRef>,
    calls: Vec<String>,
    queried: Vec<(String, u32)>,
    created: Vec<Value>,
    updated: Vec<(String, Value)>,
    network_down: bool,
    create_rejection: Option<(u16, String)>,
    next_id: usize,
}

#[derive(Default)]
pub struct FakeNotion {
    state: Mutex<FakeState>,
}

impl FakeNotion {
    pub fn with_schema(properties: &[(&str, PropertyType)]) -> Self {
        let mut map = Map::new();
        for (name, kind) in properties {
            map.insert(name.to_string(), json!({ "type": kind.as_api() }));
        }
        let fake = Self::default();
        fake.state.lock().unwrap().database = json!({ "object": "database", "properties": map });
        fake
    }

    pub fn page(id: &str) -> PageRef {
        PageRef {
            id: id.to_string(),
            url: format!("https://www.notion.so/{}", id),
            archived: false,
            in_trash: false,
        }
    }

    pub fn add_query_result(&self, page: PageRef) {
        self.state.lock().unwrap().query_results.push(page);
    }

    pub fn put_page(&self, page: PageRef) {
        self.state.lock().unwrap().pages.insert(page.id.clone(), page);
    }

    pub fn fail_network(&self) {
        self.state.lock().unwrap().network_down = true;
    }

    /// 只让创建页面失败，其余请求照常
    pub fn reject_creates(&self, status: u16, message: &str) {
        self.state.lock().unwrap().create_rejection = Some((status, message.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn queried_properties(&self) -> Vec<(String, u32)> {
        self.state.lock().unwrap().queried.clone()
    }

    pub fn created(&self) -> Vec<Value> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().updated.clone()
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, FakeState>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.network_down {
            return Err(SyncError::network(None, "connection refused"));
        }
        Ok(state)
    }
}

#[async_trait]
impl NotionApi for FakeNotion {
    async fn fetch_database(&self, database_id: &str) -> Result<Value, SyncError> {
        let state = self.begin(format!("GET /databases/{}", database_id))?;
        Ok(state.database.clone())
    }

    async fn query_by_number(
        &self,
        database_id: &str,
        property: &str,
        number: u32,
    ) -> Result<Vec<PageRef>, SyncError> {
        let mut state = self.begin(format!("POST /databases/{}/query", database_id))?;
        state.queried.push((property.to_string(), number));
        Ok(state.query_results.iter().take(1).cloned().collect())
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Option<PageRef>, SyncError> {
        let state = self.begin(format!("GET /pages/{}", page_id))?;
        Ok(state.pages.get(page_id).cloned())
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<PageRef, SyncError> {
        let mut state = self.begin("POST /pages".to_string())?;
        if let Some((status, message)) = state.create_rejection.clone() {
            return Err(SyncError::network(Some(status), message));
        }
        state.created.push(create_page_body(database_id, properties, children));
        state.next_id += 1;
        let page = Self::page(&format!("page-{}", state.next_id));
        state.pages.insert(page.id.clone(), page.clone());
        Ok(page)
    }

    async fn update_page(&self, page_id: &str, properties: Value) -> Result<PageRef, SyncError> {
        let mut state = self.begin(format!("PATCH /pages/{}", page_id))?;
        state.updated.push((page_id.to_string(), properties));
        Ok(state
            .pages
            .get(page_id)
            .cloned()
            .unwrap_or_else(|| Self::page(page_id)))
    }
}
