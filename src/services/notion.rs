//! Notion API 边界适配层
//!
//! 所有远程调用都经过 `NotionApi` trait；生产实现基于 reqwest，测试使用内存实现。

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::models::PageRef;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

#[async_trait]
pub trait NotionApi: Send + Sync {
    /// `GET /databases/{id}`，返回原始数据库对象
    async fn fetch_database(&self, database_id: &str) -> Result<Value, SyncError>;

    /// `POST /databases/{id}/query`，按数字属性精确过滤，最多一条
    async fn query_by_number(
        &self,
        database_id: &str,
        property: &str,
        number: u32,
    ) -> Result<Vec<PageRef>, SyncError>;

    /// `GET /pages/{id}`；404 返回 None
    async fn retrieve_page(&self, page_id: &str) -> Result<Option<PageRef>, SyncError>;

    /// `POST /pages`
    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<PageRef, SyncError>;

    /// `PATCH /pages/{id}`
    async fn update_page(&self, page_id: &str, properties: Value) -> Result<PageRef, SyncError>;
}

/// 查询请求体
pub fn number_filter_body(property: &str, number: u32) -> Value {
    json!({
        "filter": { "property": property, "number": { "equals": number } },
        "page_size": 1,
    })
}

/// 创建页面请求体；没有子块时省略 `children`
pub fn create_page_body(database_id: &str, properties: Value, children: Vec<Value>) -> Value {
    let mut body = json!({
        "parent": { "database_id": database_id },
        "properties": properties,
    });
    if !children.is_empty() {
        body["children"] = Value::Array(children);
    }
    body
}

/// 从错误响应体中取出 `message` 字段，取不到就用原文
pub fn error_message_from_body(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("Notion API {}: {}", status.as_u16(), body.trim()))
}

/// reqwest 实现
#[derive(Clone)]
pub struct NotionClient {
    http_client: Client,
    base_url: String,
    api_version: String,
    token: String,
}

impl NotionClient {
    pub fn new(config: &AppConfig, token: impl Into<String>) -> Result<Self, SyncError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SyncError::network(None, e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.api_version)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| SyncError::network(None, e.to_string()))
    }

    async fn read_json(response: Response) -> Result<Value, SyncError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::network(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(SyncError::network(
                Some(status.as_u16()),
                error_message_from_body(status, &body),
            ));
        }
        Ok(serde_json::from_str(&body)?)
    }

    fn page_from_value(value: Value) -> Result<PageRef, SyncError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn fetch_database(&self, database_id: &str) -> Result<Value, SyncError> {
        let request = self.http_client.get(self.url(&format!("databases/{}", database_id)));
        let response = self.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::SchemaFetch {
                status: status.as_u16(),
                message: error_message_from_body(status, &body),
            });
        }
        Self::read_json(response).await
    }

    async fn query_by_number(
        &self,
        database_id: &str,
        property: &str,
        number: u32,
    ) -> Result<Vec<PageRef>, SyncError> {
        let request = self
            .http_client
            .post(self.url(&format!("databases/{}/query", database_id)))
            .json(&number_filter_body(property, number));
        let value = Self::read_json(self.send(request).await?).await?;

        let results = value
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!("Query on '{}' = {} returned {} page(s)", property, number, results.len());

        results.into_iter().map(Self::page_from_value).collect()
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Option<PageRef>, SyncError> {
        let request = self.http_client.get(self.url(&format!("pages/{}", page_id)));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value = Self::read_json(response).await?;
        Self::page_from_value(value).map(Some)
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: Vec<Value>,
    ) -> Result<PageRef, SyncError> {
        let request = self
            .http_client
            .post(self.url("pages"))
            .json(&create_page_body(database_id, properties, children));
        let value = Self::read_json(self.send(request).await?).await?;
        Self::page_from_value(value)
    }

    async fn update_page(&self, page_id: &str, properties: Value) -> Result<PageRef, SyncError> {
        let request = self
            .http_client
            .patch(self.url(&format!("pages/{}", page_id)))
            .json(&json!({ "properties": properties }));
        let value = Self::read_json(self.send(request).await?).await?;
        Self::page_from_value(value)
    }
}
