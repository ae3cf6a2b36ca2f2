//! 远程 schema 解析与属性别名匹配
//!
//! 用户的数据库列名和语言完全由用户决定，这里按别名和类型约束找到逻辑字段
//! 对应的真实列。schema 每次都重新拉取，不做缓存。

use super::notion::NotionApi;
use crate::error::SyncError;
use crate::models::{PropertyType, RemoteSchema, SchemaProperty};
use log::debug;
use serde_json::Value;

/// 解析结果：真实属性名和类型
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    pub name: String,
    pub kind: PropertyType,
}

/// 逻辑字段：别名（越具体越靠前）加允许的类型
#[derive(Debug, Clone, Copy)]
pub struct LogicalField {
    pub aliases: &'static [&'static str],
    pub allowed: &'static [PropertyType],
}

pub mod fields {
    use super::LogicalField;
    use crate::models::PropertyType::*;

    pub const TITLE: LogicalField = LogicalField {
        aliases: &["Title", "Name", "Problem", "题目", "标题", "名称"],
        allowed: &[Title],
    };
    pub const NUMBER: LogicalField = LogicalField {
        aliases: &["Number", "No.", "No", "ID", "题号", "编号", "序号"],
        allowed: &[Number],
    };
    pub const DIFFICULTY: LogicalField = LogicalField {
        aliases: &["Difficulty", "Level", "难度"],
        allowed: &[Select, RichText],
    };
    pub const STATUS: LogicalField = LogicalField {
        aliases: &["Status", "State", "状态"],
        allowed: &[Select, RichText],
    };
    pub const URL: LogicalField = LogicalField {
        aliases: &["URL", "Link", "链接", "地址"],
        allowed: &[Url, RichText],
    };
    pub const TIME_SPENT: LogicalField = LogicalField {
        aliases: &["Time Spent", "Duration", "Time", "耗时", "用时"],
        allowed: &[Number, RichText],
    };
    pub const DATE: LogicalField = LogicalField {
        aliases: &["Date", "Solved", "日期"],
        allowed: &[Date],
    };
    pub const NOTES: LogicalField = LogicalField {
        aliases: &["Notes", "Note", "Remarks", "备注", "笔记"],
        allowed: &[RichText],
    };
    pub const LANGUAGE: LogicalField = LogicalField {
        aliases: &["Language", "Lang", "语言"],
        allowed: &[Select, RichText],
    };
    pub const TAGS: LogicalField = LogicalField {
        aliases: &["Tags", "Topics", "Tag", "标签"],
        allowed: &[MultiSelect, RichText],
    };
    pub const COMPANIES: LogicalField = LogicalField {
        aliases: &["Companies", "Company", "公司"],
        allowed: &[MultiSelect, RichText],
    };
    pub const ACCEPTANCE: LogicalField = LogicalField {
        aliases: &["Acceptance", "AC Rate", "通过率"],
        allowed: &[RichText],
    };
    pub const HINT_NEEDED: LogicalField = LogicalField {
        aliases: &["Hint Needed", "Needed Hint", "Hint", "提示"],
        allowed: &[Checkbox],
    };
    pub const CAN_REDO: LogicalField = LogicalField {
        aliases: &["Can Redo", "Redo", "Review", "重做"],
        allowed: &[Checkbox],
    };
}

/// 把 `GET /databases/{id}` 的响应转成 schema，保留属性声明顺序
pub fn parse_schema(database: &Value) -> Result<RemoteSchema, SyncError> {
    let properties = database
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SyncError::schema("database response has no properties"))?;

    Ok(RemoteSchema::new(
        properties
            .iter()
            .map(|(name, definition)| SchemaProperty {
                name: name.clone(),
                kind: PropertyType::from_api(
                    definition.get("type").and_then(Value::as_str).unwrap_or_default(),
                ),
            })
            .collect(),
    ))
}

/// 拉取最新 schema
pub async fn fetch_schema(api: &dyn NotionApi, database_id: &str) -> Result<RemoteSchema, SyncError> {
    let database = api.fetch_database(database_id).await?;
    let schema = parse_schema(&database)?;
    debug!("Fetched schema with {} properties", schema.len());
    Ok(schema)
}

/// 按别名解析属性
///
/// 先找与任一别名完全相同（大小写不敏感）的属性，再找包含别名的属性；
/// 每一轮都按别名顺序、再按属性声明顺序匹配。`allowed` 为空表示不限类型。
pub fn resolve_property(
    schema: &RemoteSchema,
    aliases: &[&str],
    allowed: &[PropertyType],
) -> Option<ResolvedProperty> {
    let type_ok = |property: &SchemaProperty| allowed.is_empty() || allowed.contains(&property.kind);
    let aliases: Vec<String> = aliases
        .iter()
        .map(|alias| alias.trim().to_lowercase())
        .filter(|alias| !alias.is_empty())
        .collect();

    let exact = aliases.iter().find_map(|alias| {
        schema
            .properties()
            .iter()
            .find(|p| type_ok(p) && p.name.trim().to_lowercase() == *alias)
    });

    let matched = exact.or_else(|| {
        aliases.iter().find_map(|alias| {
            schema
                .properties()
                .iter()
                .find(|p| type_ok(p) && p.name.to_lowercase().contains(alias.as_str()))
        })
    })?;

    Some(ResolvedProperty {
        name: matched.name.clone(),
        kind: matched.kind.clone(),
    })
}

pub fn resolve_field(schema: &RemoteSchema, field: LogicalField) -> Option<ResolvedProperty> {
    resolve_property(schema, field.aliases, field.allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(props: &[(&str, PropertyType)]) -> RemoteSchema {
        props.iter().map(|(n, k)| (*n, k.clone())).collect()
    }

    #[test]
    fn test_parse_schema_keeps_declaration_order() {
        let database = json!({
            "object": "database",
            "properties": {
                "题目": {"id": "title", "type": "title", "title": {}},
                "No.": {"id": "a", "type": "number", "number": {}},
                "Formula": {"id": "b", "type": "formula"},
            }
        });
        let schema = parse_schema(&database).unwrap();
        let names: Vec<_> = schema.properties().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["题目", "No.", "Formula"]);
        assert_eq!(schema.properties()[2].kind, PropertyType::Other("formula".to_string()));
    }

    #[test]
    fn test_parse_schema_without_properties() {
        assert!(matches!(parse_schema(&json!({"object": "error"})), Err(SyncError::Schema(_))));
    }

    #[test]
    fn test_exact_match_beats_substring_match() {
        let s = schema(&[
            ("Needed Hint Status", PropertyType::Select),
            ("Status", PropertyType::Select),
        ]);
        let resolved = resolve_property(&s, &["Status"], &[]).unwrap();
        assert_eq!(resolved.name, "Status");
    }

    #[test]
    fn test_substring_match_and_case() {
        let s = schema(&[("Problem TITLE", PropertyType::Title)]);
        let resolved = resolve_field(&s, fields::TITLE).unwrap();
        assert_eq!(resolved.name, "Problem TITLE");
        assert_eq!(resolved.kind, PropertyType::Title);
    }

    #[test]
    fn test_type_constraint_filters_candidates() {
        let s = schema(&[
            ("Number", PropertyType::RichText),
            ("题号", PropertyType::Number),
        ]);
        assert_eq!(resolve_field(&s, fields::NUMBER).unwrap().name, "题号");

        let s = schema(&[("Number", PropertyType::RichText)]);
        assert_eq!(resolve_field(&s, fields::NUMBER), None);
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let s = schema(&[
            ("Hint used", PropertyType::Checkbox),
            ("Hint asked", PropertyType::Checkbox),
        ]);
        assert_eq!(resolve_field(&s, fields::HINT_NEEDED).unwrap().name, "Hint used");
    }

    #[test]
    fn test_empty_schema_resolves_nothing() {
        assert_eq!(resolve_field(&RemoteSchema::default(), fields::TITLE), None);
    }
}
