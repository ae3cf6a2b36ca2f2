//! 代码提取
//!
//! 两级回退：先从编辑器可视行重建源码，找不到编辑器再扫描本地存储。

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::VecDeque;

/// 判定“像代码”所需的最短长度
pub const MIN_CODE_LENGTH: usize = 20;

const CODE_KEYWORDS: &[&str] = &[
    "class", "def", "function", "return", "public", "private", "int", "void", "var", "let",
    "const", "import", "#include", "fn", "func", "struct", "impl", "while", "for", "if",
];

/// 编辑器中的一条可视行
#[derive(Debug, Clone, PartialEq)]
pub struct VisualLine {
    pub top: f64,
    pub left: f64,
    pub dom_index: usize,
    pub text: String,
}

impl VisualLine {
    pub fn new(top: f64, left: f64, dom_index: usize, text: impl Into<String>) -> Self {
        Self {
            top,
            left,
            dom_index,
            text: text.into(),
        }
    }
}

/// 按 top → left → DOM 顺序重建逻辑行序
///
/// 编辑器会虚拟化并绝对定位行元素，DOM 顺序不等于源码顺序。
pub fn reconstruct_code(lines: &[VisualLine]) -> String {
    let mut ordered: Vec<&VisualLine> = lines.iter().collect();
    ordered.sort_by(|a, b| {
        a.top
            .partial_cmp(&b.top)
            .unwrap_or(Ordering::Equal)
            .then(a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal))
            .then(a.dom_index.cmp(&b.dom_index))
    });

    ordered
        .iter()
        .map(|line| line.text.replace('\u{a0}', " "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// 从 `style` 属性中读取像素偏移，例如 `top:19px;height:19px;`
pub fn style_offset(style: &str, property: &str) -> Option<f64> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        if name.trim().eq_ignore_ascii_case(property) {
            value.trim().trim_end_matches("px").trim().parse().ok()
        } else {
            None
        }
    })
}

pub fn looks_like_code(text: &str) -> bool {
    if text.trim().chars().count() < MIN_CODE_LENGTH {
        return false;
    }
    if text.contains('\n') {
        return true;
    }
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '#'))
        .any(|token| CODE_KEYWORDS.contains(&token))
}

fn language_matches(tag: &str, wanted: &str) -> bool {
    let normalize = |s: &str| s.trim().to_lowercase().replace(['-', '_', ' '], "");
    let (tag, wanted) = (normalize(tag), normalize(wanted));
    !wanted.is_empty() && (tag == wanted || tag.trim_end_matches('3') == wanted.trim_end_matches('3'))
}

/// 判断存储键是否可能与当前题目或编辑器有关
pub fn storage_key_is_relevant(key: &str, slug: Option<&str>, number: Option<u32>) -> bool {
    let key_lower = key.to_lowercase();
    if let Some(slug) = slug.filter(|s| !s.is_empty()) {
        if key_lower.contains(&slug.to_lowercase()) {
            return true;
        }
    }
    if let Some(number) = number {
        let number = number.to_string();
        if key_lower
            .split(|c: char| !c.is_ascii_digit())
            .any(|part| part == number)
        {
            return true;
        }
    }
    ["code", "editor", "lc-"].iter().any(|hint| key_lower.contains(hint))
}

/// 广度优先搜索嵌套对象中的 `code` 字段
fn search_code(root: &Value, language: &str) -> Option<String> {
    let mut queue = VecDeque::from([root]);

    while let Some(value) = queue.pop_front() {
        match value {
            Value::Object(map) => {
                let code = map.get("code").and_then(Value::as_str);
                let lang = map
                    .get("language")
                    .or_else(|| map.get("lang"))
                    .or_else(|| map.get("langSlug"))
                    .and_then(Value::as_str);

                if let (Some(code), Some(lang)) = (code, lang) {
                    if language_matches(lang, language) && looks_like_code(code) {
                        return Some(code.trim().to_string());
                    }
                }
                queue.extend(map.values());
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }

    None
}

/// 扫描本地存储条目，第一个匹配即返回
pub fn code_from_storage(
    entries: &[(String, String)],
    slug: Option<&str>,
    number: Option<u32>,
    language: &str,
) -> Option<String> {
    for (key, raw) in entries {
        if !storage_key_is_relevant(key, slug, number) {
            continue;
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::String(text)) => {
                // 有些编辑器把源码直接存成 JSON 字符串，键名里带语言
                if key_mentions_language(key, language) && looks_like_code(&text) {
                    return Some(text.trim().to_string());
                }
            }
            Ok(value) => {
                if let Some(code) = search_code(&value, language) {
                    return Some(code);
                }
            }
            Err(_) => {
                if key_mentions_language(key, language) && looks_like_code(raw) {
                    return Some(raw.trim().to_string());
                }
            }
        }
    }
    None
}

fn key_mentions_language(key: &str, language: &str) -> bool {
    key.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .any(|part| language_matches(part, language))
}
