// 数据模型模块
// 题目记录、缓存条目、远程 schema 与计时状态

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 题目难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Unknown,
}

impl Difficulty {
    /// 中英双语词表匹配（大小写不敏感）
    pub fn from_label(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        if lower.contains("easy") || lower.contains("简单") {
            Difficulty::Easy
        } else if lower.contains("medium") || lower.contains("中等") {
            Difficulty::Medium
        } else if lower.contains("hard") || lower.contains("困难") {
            Difficulty::Hard
        } else {
            Difficulty::Unknown
        }
    }

    pub fn as_label(&self) -> Option<&'static str> {
        match self {
            Difficulty::Easy => Some("Easy"),
            Difficulty::Medium => Some("Medium"),
            Difficulty::Hard => Some("Hard"),
            Difficulty::Unknown => None,
        }
    }
}

/// 从页面提取出的题目记录
///
/// `number` 是唯一稳定的去重键；标题、URL、slug 在不同会话之间可能变化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub number: Option<u32>,
    pub title: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub companies: Vec<String>,
    pub acceptance: Option<String>,
    pub url: String,
    pub captured_at: DateTime<Utc>,
    pub code: Option<String>,
    pub language: Option<String>,
}

impl ProblemRecord {
    pub fn cache_key(&self) -> Option<String> {
        self.number.map(cache_key)
    }
}

/// 缓存键：`problem_{number}`
pub fn cache_key(number: u32) -> String {
    format!("problem_{}", number)
}

/// 保序去重
pub fn push_unique(items: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !items.iter().any(|existing| existing == value) {
        items.push(value.to_string());
    }
}

/// 本地缓存条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub page_id: String,
    pub page_url: String,
    pub timestamp: DateTime<Utc>,
}

/// 远程属性类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Title,
    Number,
    Select,
    MultiSelect,
    Url,
    RichText,
    Date,
    Checkbox,
    Other(String),
}

impl PropertyType {
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "title" => PropertyType::Title,
            "number" => PropertyType::Number,
            "select" => PropertyType::Select,
            "multi_select" => PropertyType::MultiSelect,
            "url" => PropertyType::Url,
            "rich_text" => PropertyType::RichText,
            "date" => PropertyType::Date,
            "checkbox" => PropertyType::Checkbox,
            other => PropertyType::Other(other.to_string()),
        }
    }

    pub fn as_api(&self) -> &str {
        match self {
            PropertyType::Title => "title",
            PropertyType::Number => "number",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Url => "url",
            PropertyType::RichText => "rich_text",
            PropertyType::Date => "date",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Other(kind) => kind,
        }
    }
}

/// schema 中的单个属性
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    pub name: String,
    pub kind: PropertyType,
}

/// 远程数据库 schema，按声明顺序保存
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSchema {
    properties: Vec<SchemaProperty>,
}

impl RemoteSchema {
    pub fn new(properties: Vec<SchemaProperty>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[SchemaProperty] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }
}

impl<S: Into<String>> FromIterator<(S, PropertyType)> for RemoteSchema {
    fn from_iter<I: IntoIterator<Item = (S, PropertyType)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(name, kind)| SchemaProperty {
                    name: name.into(),
                    kind,
                })
                .collect(),
        }
    }
}

/// 远程页面引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trash: bool,
}

impl PageRef {
    pub fn is_live(&self) -> bool {
        !self.archived && !self.in_trash
    }
}

/// 计时状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub elapsed_time: u64,
    pub is_running: bool,
    pub start_time: Option<i64>,
    pub tab_url: Option<String>,
}

/// 复习标记（更新路径唯一会修改的字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFlags {
    pub hint_needed: bool,
    pub can_redo: bool,
}

/// 保存请求：题目记录加上用户在弹窗中填写的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub problem: ProblemRecord,
    pub status: Option<String>,
    pub time_spent_ms: u64,
    pub solved_on: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub flags: ReviewFlags,
}

impl SaveRequest {
    pub fn new(problem: ProblemRecord) -> Self {
        Self {
            problem,
            status: None,
            time_spent_ms: 0,
            solved_on: None,
            notes: None,
            flags: ReviewFlags::default(),
        }
    }
}

/// 提取请求（来自 UI）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExtractOptions {
    pub include_code: bool,
    pub language: String,
}

/// 提取响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ProblemRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractResponse {
    pub fn ok(data: ProblemRecord) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
