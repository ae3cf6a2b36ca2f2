//! 写入远程数据库
//!
//! 把题目记录映射到当前 schema 上：解析不到的字段直接跳过，非勾选字段值为空也
//! 跳过，勾选字段一旦解析到就总是写入明确的 true/false。

use super::notion::NotionApi;
use super::schema::{fields, resolve_field, LogicalField, ResolvedProperty};
use super::timer::format_duration;
use crate::error::SyncError;
use crate::models::{PageRef, PropertyType, RemoteSchema, ReviewFlags, SaveRequest};
use log::{info, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// 单段富文本的长度上限
pub const RICH_TEXT_CHUNK: usize = 2000;

/// 按字符数切分长文本
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn rich_text(text: &str) -> Value {
    Value::Array(
        chunk_text(text, RICH_TEXT_CHUNK)
            .into_iter()
            .map(|content| json!({ "type": "text", "text": { "content": content } }))
            .collect(),
    )
}

fn option_name(text: &str) -> String {
    // 选项名不能包含逗号
    text.replace(',', " ").trim().to_string()
}

/// 力扣语言标签 → 代码块语言
pub fn code_block_language(tag: &str) -> &'static str {
    match tag.trim().to_lowercase().as_str() {
        "python" | "python3" => "python",
        "cpp" | "c++" => "c++",
        "c" => "c",
        "java" => "java",
        "javascript" | "js" => "javascript",
        "typescript" | "ts" => "typescript",
        "csharp" | "c#" => "c#",
        "golang" | "go" => "go",
        "rust" => "rust",
        "kotlin" => "kotlin",
        "swift" => "swift",
        "ruby" => "ruby",
        "scala" => "scala",
        "php" => "php",
        "dart" => "dart",
        "elixir" => "elixir",
        "erlang" => "erlang",
        "bash" | "shell" => "shell",
        "mysql" | "mssql" | "oraclesql" | "postgresql" | "pythondata" => "sql",
        _ => "plain text",
    }
}

/// 源码作为一个代码块，内容按段切分成多条富文本
pub fn build_code_children(code: &str, language: &str) -> Vec<Value> {
    if code.trim().is_empty() {
        return Vec::new();
    }
    vec![json!({
        "object": "block",
        "type": "code",
        "code": {
            "language": code_block_language(language),
            "rich_text": rich_text(code),
        }
    })]
}

/// 文本值按属性类型编码
fn text_property(kind: &PropertyType, text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match kind {
        PropertyType::Title => Some(json!({ "title": rich_text(text) })),
        PropertyType::RichText => Some(json!({ "rich_text": rich_text(text) })),
        PropertyType::Select => Some(json!({ "select": { "name": option_name(text) } })),
        PropertyType::MultiSelect => Some(json!({ "multi_select": [{ "name": option_name(text) }] })),
        PropertyType::Url => Some(json!({ "url": text })),
        PropertyType::Number => text.parse::<f64>().ok().map(|n| json!({ "number": n })),
        _ => None,
    }
}

fn list_property(kind: &PropertyType, items: &[String]) -> Option<Value> {
    if items.is_empty() {
        return None;
    }
    match kind {
        PropertyType::MultiSelect => Some(json!({
            "multi_select": items
                .iter()
                .map(|item| option_name(item))
                .filter(|name| !name.is_empty())
                .map(|name| json!({ "name": name }))
                .collect::<Vec<_>>()
        })),
        other => text_property(other, &items.join(", ")),
    }
}

/// 属性载荷构建器：同一列只写第一次解析到的值
struct PropertyPayload<'a> {
    schema: &'a RemoteSchema,
    properties: Map<String, Value>,
}

impl<'a> PropertyPayload<'a> {
    fn new(schema: &'a RemoteSchema) -> Self {
        Self {
            schema,
            properties: Map::new(),
        }
    }

    fn set(&mut self, field: LogicalField, encode: impl FnOnce(&ResolvedProperty) -> Option<Value>) {
        if let Some(property) = resolve_field(self.schema, field) {
            if self.properties.contains_key(&property.name) {
                return;
            }
            if let Some(value) = encode(&property) {
                self.properties.insert(property.name, value);
            }
        }
    }

    /// 写入勾选值；列已被另一个标记占用时返回 false
    fn set_checkbox(&mut self, field: LogicalField, checked: bool) -> bool {
        let Some(property) = resolve_field(self.schema, field) else {
            return false;
        };
        if self.properties.contains_key(&property.name) {
            warn!(
                "Checkbox '{}' already holds another flag, skipping {:?}",
                property.name, field.aliases[0]
            );
            return false;
        }
        self.properties
            .insert(property.name, json!({ "checkbox": checked }));
        true
    }
}

/// 构建创建页面用的属性；没有标题列时报错
pub fn build_properties(request: &SaveRequest, schema: &RemoteSchema) -> Result<Map<String, Value>, SyncError> {
    let title = resolve_field(schema, fields::TITLE).ok_or_else(|| SyncError::schema("no title property"))?;
    let problem = &request.problem;

    let mut payload = PropertyPayload::new(schema);
    payload
        .properties
        .insert(title.name, json!({ "title": rich_text(&problem.title) }));

    payload.set(fields::NUMBER, |_| problem.number.map(|n| json!({ "number": n })));
    payload.set(fields::DIFFICULTY, |p| {
        problem.difficulty.as_label().and_then(|label| text_property(&p.kind, label))
    });
    payload.set(fields::STATUS, |p| {
        request.status.as_deref().and_then(|status| text_property(&p.kind, status))
    });
    payload.set(fields::URL, |p| text_property(&p.kind, &problem.url));
    payload.set(fields::TIME_SPENT, |p| {
        if request.time_spent_ms == 0 {
            return None;
        }
        match p.kind {
            PropertyType::Number => {
                let minutes = request.time_spent_ms as f64 / 60_000.0;
                Some(json!({ "number": (minutes * 10.0).round() / 10.0 }))
            }
            ref kind => text_property(kind, &format_duration(request.time_spent_ms)),
        }
    });
    payload.set(fields::DATE, |_| {
        let day = request
            .solved_on
            .unwrap_or_else(|| problem.captured_at.date_naive());
        Some(json!({ "date": { "start": day.format("%Y-%m-%d").to_string() } }))
    });
    payload.set(fields::NOTES, |p| {
        request.notes.as_deref().and_then(|notes| text_property(&p.kind, notes))
    });
    payload.set(fields::LANGUAGE, |p| {
        problem.language.as_deref().and_then(|lang| text_property(&p.kind, lang))
    });
    payload.set(fields::TAGS, |p| list_property(&p.kind, &problem.tags));
    payload.set(fields::COMPANIES, |p| list_property(&p.kind, &problem.companies));
    payload.set(fields::ACCEPTANCE, |p| {
        problem.acceptance.as_deref().and_then(|rate| text_property(&p.kind, rate))
    });
    payload.set_checkbox(fields::HINT_NEEDED, request.flags.hint_needed);
    payload.set_checkbox(fields::CAN_REDO, request.flags.can_redo);

    Ok(payload.properties)
}

/// 更新路径只修改两个勾选字段
pub fn build_flag_properties(flags: &ReviewFlags, schema: &RemoteSchema) -> Result<Map<String, Value>, SyncError> {
    let mut payload = PropertyPayload::new(schema);
    let hint = payload.set_checkbox(fields::HINT_NEEDED, flags.hint_needed);
    let redo = payload.set_checkbox(fields::CAN_REDO, flags.can_redo);
    if !hint && !redo {
        return Err(SyncError::schema("no checkbox properties"));
    }
    Ok(payload.properties)
}

#[derive(Clone)]
pub struct RecordWriter {
    api: Arc<dyn NotionApi>,
    database_id: String,
}

impl RecordWriter {
    pub fn new(api: Arc<dyn NotionApi>, database_id: impl Into<String>) -> Self {
        Self {
            api,
            database_id: database_id.into(),
        }
    }

    /// 创建页面；属性构建失败时不会发出任何请求
    pub async fn create(&self, request: &SaveRequest, schema: &RemoteSchema) -> Result<PageRef, SyncError> {
        let properties = build_properties(request, schema)?;
        let problem = &request.problem;
        let children = match problem.code.as_deref() {
            Some(code) => build_code_children(code, problem.language.as_deref().unwrap_or_default()),
            None => Vec::new(),
        };

        let page = self
            .api
            .create_page(&self.database_id, Value::Object(properties), children)
            .await?;
        info!("Created page {} for problem {:?} '{}'", page.id, problem.number, problem.title);
        Ok(page)
    }

    pub async fn update(&self, page_id: &str, flags: &ReviewFlags, schema: &RemoteSchema) -> Result<(), SyncError> {
        let properties = build_flag_properties(flags, schema)?;
        self.api.update_page(page_id, Value::Object(properties)).await?;
        info!("Updated review flags on page {}", page_id);
        Ok(())
    }
}
