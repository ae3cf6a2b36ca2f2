//! 题目页面字段提取
//!
//! 每个字段按顺序尝试一组选择器，第一个取到非空值的胜出；选择器全部失效时
//! 退回到内嵌脚本中的 JSON 片段，标题最后再退回到 URL slug。

use super::code::{code_from_storage, reconstruct_code, style_offset, VisualLine};
use crate::error::SyncError;
use crate::models::{push_unique, Difficulty, ExtractOptions, ProblemRecord};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

static PROBLEM_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?leetcode\.(?:com|cn)/problems/([A-Za-z0-9_-]+)").expect("valid regex")
});
static NUMBERED_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*[.．]\s*(.+?)\s*$").expect("valid regex"));
static SCRIPT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""questionFrontendId"\s*:\s*"?(\d+)"?"#).expect("valid regex"));
// 按优先级排列；页面级的 `title` 可能出现在题目对象之前
static SCRIPT_TITLES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["questionTitle", "translatedTitle", "title"]
        .iter()
        .map(|key| {
            Regex::new(&format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)+)""#, key)).expect("valid regex")
        })
        .collect()
});
static SCRIPT_DIFFICULTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""difficulty"\s*:\s*"([^"]+)""#).expect("valid regex"));
static SCRIPT_TOPIC_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"topicTags"\s*:\s*\[(.*?)\]"#).expect("valid regex"));
static SCRIPT_COMPANY_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"companyTags"\s*:\s*\[(.*?)\]"#).expect("valid regex"));
static SCRIPT_TAG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""name"\s*:\s*"((?:[^"\\]|\\.)+)""#).expect("valid regex"));
static SCRIPT_AC_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""acRate"\s*:\s*"?([\d.]+)\s*%?"?"#).expect("valid regex"));
static TEXT_ACCEPTANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:acceptance\s*rate|acceptance|通过率)\s*[:：]?\s*([\d.]+\s*%)").expect("valid regex")
});

const TITLE_SELECTORS: &[&str] = &[
    "div.text-title-large a",
    "div.text-title-large",
    "[data-cy=\"question-title\"]",
    "h4[data-cypress=\"QuestionTitle\"]",
    ".question-title h3",
];
const DIFFICULTY_SELECTORS: &[&str] = &[
    "div.text-difficulty-easy",
    "div.text-difficulty-medium",
    "div.text-difficulty-hard",
    "[diff]",
    "[data-degree]",
    ".difficulty-label",
    "[class*=\"difficulty\"]",
];
const TAG_SELECTORS: &[&str] = &["a[href*=\"/tag/\"]", ".topic-tag"];
const COMPANY_SELECTORS: &[&str] = &["a[href*=\"/company/\"]", ".company-tag"];
const ACCEPTANCE_SELECTORS: &[&str] = &["[data-e2e=\"acceptance-rate\"]", ".acceptance-rate"];
const EDITOR_LINE_SELECTORS: &[&str] = &[".view-lines .view-line", ".cm-content .cm-line"];

/// 页面快照：URL、DOM 以及本地存储条目
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub local_storage: Vec<(String, String)>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            local_storage: Vec::new(),
        }
    }

    pub fn with_storage(mut self, entries: Vec<(String, String)>) -> Self {
        self.local_storage = entries;
        self
    }
}

/// 从 URL 中取出题目 slug；不是题目页时返回 None
pub fn problem_slug(url: &str) -> Option<String> {
    PROBLEM_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `two-sum` → `Two Sum`
pub fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `42. Trapping Rain Water` → (Some(42), "Trapping Rain Water")
pub fn split_numbered_title(text: &str) -> (Option<u32>, String) {
    match NUMBERED_TITLE.captures(text) {
        Some(caps) => (
            caps.get(1).and_then(|m| m.as_str().parse().ok()),
            caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        ),
        None => (None, text.trim().to_string()),
    }
}

fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 已解析的页面视图
struct PageView {
    html: Html,
    scripts: Vec<String>,
}

impl PageView {
    fn parse(source: &str, script_selector: &Selector) -> Self {
        let html = Html::parse_document(source);
        let scripts = html
            .select(script_selector)
            .map(|el| el.text().collect::<String>())
            .filter(|text| !text.trim().is_empty())
            .collect();
        Self { html, scripts }
    }

    fn script_capture(&self, pattern: &Regex) -> Option<String> {
        self.scripts
            .iter()
            .find_map(|script| pattern.captures(script)?.get(1).map(|m| m.as_str().to_string()))
    }

    fn body_text(&self) -> String {
        self.html
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 页面字段提取器
pub struct PageFieldExtractor {
    title_selectors: Vec<Selector>,
    difficulty_selectors: Vec<Selector>,
    tag_selectors: Vec<Selector>,
    company_selectors: Vec<Selector>,
    acceptance_selectors: Vec<Selector>,
    editor_line_selectors: Vec<Selector>,
    script_selector: Selector,
}

impl PageFieldExtractor {
    pub fn new() -> Result<Self, SyncError> {
        Ok(Self {
            title_selectors: Self::compile_selectors(TITLE_SELECTORS)?,
            difficulty_selectors: Self::compile_selectors(DIFFICULTY_SELECTORS)?,
            tag_selectors: Self::compile_selectors(TAG_SELECTORS)?,
            company_selectors: Self::compile_selectors(COMPANY_SELECTORS)?,
            acceptance_selectors: Self::compile_selectors(ACCEPTANCE_SELECTORS)?,
            editor_line_selectors: Self::compile_selectors(EDITOR_LINE_SELECTORS)?,
            script_selector: Selector::parse("script")
                .map_err(|e| SyncError::extraction(format!("invalid selector 'script': {}", e)))?,
        })
    }

    fn compile_selectors(sources: &[&str]) -> Result<Vec<Selector>, SyncError> {
        let mut selectors = Vec::new();
        for source in sources {
            match Selector::parse(source) {
                Ok(selector) => selectors.push(selector),
                Err(e) => warn!("Failed to compile selector '{}': {}", source, e),
            }
        }
        if selectors.is_empty() && !sources.is_empty() {
            return Err(SyncError::extraction(format!(
                "no valid selectors among {}",
                sources.join(", ")
            )));
        }
        Ok(selectors)
    }

    /// 提取题目记录
    pub fn extract(&self, page: &PageSnapshot, options: &ExtractOptions) -> Result<ProblemRecord, SyncError> {
        let mut record = self.extract_fields(page, Utc::now())?;
        if options.include_code {
            self.attach_code(&mut record, page, options);
        }
        Ok(record)
    }

    fn extract_fields(&self, page: &PageSnapshot, now: DateTime<Utc>) -> Result<ProblemRecord, SyncError> {
        let slug = problem_slug(&page.url)
            .ok_or_else(|| SyncError::extraction(format!("not a problem page: {}", page.url)))?;
        let view = PageView::parse(&page.html, &self.script_selector);

        let (dom_number, title) = self
            .title_from_dom(&view)
            .or_else(|| {
                SCRIPT_TITLES
                    .iter()
                    .find_map(|pattern| view.script_capture(pattern))
                    .map(|raw| split_numbered_title(&unescape_json_string(&raw)))
            })
            .unwrap_or_else(|| (None, title_from_slug(&slug)));

        let number = dom_number.or_else(|| {
            view.script_capture(&SCRIPT_NUMBER)
                .and_then(|raw| raw.parse().ok())
        });

        let difficulty = self
            .difficulty_from_dom(&view)
            .or_else(|| {
                view.script_capture(&SCRIPT_DIFFICULTY)
                    .map(|raw| Difficulty::from_label(&raw))
                    .filter(|d| *d != Difficulty::Unknown)
            })
            .unwrap_or_default();

        let tags = Self::texts_from_dom(&view, &self.tag_selectors)
            .or_else(|| Self::names_from_script(&view, &SCRIPT_TOPIC_TAGS))
            .unwrap_or_default();

        let companies = Self::texts_from_dom(&view, &self.company_selectors)
            .or_else(|| Self::names_from_script(&view, &SCRIPT_COMPANY_TAGS))
            .unwrap_or_default();

        let acceptance = self
            .acceptance_from_dom(&view)
            .or_else(|| {
                view.script_capture(&SCRIPT_AC_RATE)
                    .and_then(|raw| raw.parse::<f64>().ok())
                    .map(|rate| format!("{:.1}%", rate))
            });

        debug!(
            "Extracted problem #{:?} '{}' ({:?}, {} tags) from {}",
            number,
            title,
            difficulty,
            tags.len(),
            page.url
        );

        Ok(ProblemRecord {
            number,
            title,
            difficulty,
            tags,
            companies,
            acceptance,
            url: page.url.clone(),
            captured_at: now,
            code: None,
            language: None,
        })
    }

    fn title_from_dom(&self, view: &PageView) -> Option<(Option<u32>, String)> {
        self.title_selectors.iter().find_map(|selector| {
            let text = view.html.select(selector).map(|el| element_text(&el)).find(|t| !t.is_empty())?;
            Some(split_numbered_title(&text))
        })
    }

    fn difficulty_from_dom(&self, view: &PageView) -> Option<Difficulty> {
        self.difficulty_selectors.iter().find_map(|selector| {
            view.html
                .select(selector)
                .map(|el| {
                    let text = element_text(&el);
                    let label = if text.is_empty() {
                        el.value().attr("diff").unwrap_or_default().to_string()
                    } else {
                        text
                    };
                    Difficulty::from_label(&label)
                })
                .find(|d| *d != Difficulty::Unknown)
        })
    }

    fn texts_from_dom(view: &PageView, selectors: &[Selector]) -> Option<Vec<String>> {
        selectors.iter().find_map(|selector| {
            let mut values = Vec::new();
            for element in view.html.select(selector) {
                push_unique(&mut values, &element_text(&element));
            }
            (!values.is_empty()).then_some(values)
        })
    }

    fn names_from_script(view: &PageView, list_pattern: &Regex) -> Option<Vec<String>> {
        let body = view.script_capture(list_pattern)?;
        let mut names = Vec::new();
        for caps in SCRIPT_TAG_NAME.captures_iter(&body) {
            if let Some(m) = caps.get(1) {
                push_unique(&mut names, &unescape_json_string(m.as_str()));
            }
        }
        (!names.is_empty()).then_some(names)
    }

    fn acceptance_from_dom(&self, view: &PageView) -> Option<String> {
        self.acceptance_selectors
            .iter()
            .find_map(|selector| {
                view.html
                    .select(selector)
                    .map(|el| element_text(&el))
                    .find(|t| t.contains('%'))
            })
            .map(|text| {
                TEXT_ACCEPTANCE
                    .captures(&text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().replace(' ', ""))
                    .unwrap_or(text)
            })
            .or_else(|| {
                TEXT_ACCEPTANCE
                    .captures(&view.body_text())
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().replace(' ', ""))
            })
    }

    /// 编辑器可视行 → 本地存储 两级回退
    fn attach_code(&self, record: &mut ProblemRecord, page: &PageSnapshot, options: &ExtractOptions) {
        let language = options.language.trim();
        let html = Html::parse_document(&page.html);

        let from_editor = self
            .editor_line_selectors
            .iter()
            .map(|selector| {
                html.select(selector)
                    .enumerate()
                    .map(|(index, el)| {
                        let style = el.value().attr("style").unwrap_or_default();
                        VisualLine::new(
                            style_offset(style, "top").unwrap_or(0.0),
                            style_offset(style, "left").unwrap_or(0.0),
                            index,
                            el.text().collect::<String>(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .find(|lines| !lines.is_empty())
            .map(|lines| reconstruct_code(&lines))
            .filter(|code| !code.is_empty());

        let code = from_editor.or_else(|| {
            let slug = problem_slug(&page.url);
            code_from_storage(&page.local_storage, slug.as_deref(), record.number, language)
        });

        if code.is_none() {
            debug!("No code found for {} ({})", page.url, language);
        }
        record.code = code;
        record.language = (!language.is_empty()).then(|| language.to_string());
    }
}

/// 会话级提取缓存：按精确 URL 缓存 10 分钟，代码永不走缓存
pub struct PageCache {
    entries: HashMap<String, (DateTime<Utc>, ProblemRecord)>,
    ttl: Duration,
}

impl Default for PageCache {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::minutes(10),
        }
    }
}

impl PageCache {
    pub fn get(&mut self, url: &str, now: DateTime<Utc>) -> Option<ProblemRecord> {
        let (stored_at, record) = self.entries.get(url)?;
        if now - *stored_at > self.ttl {
            self.entries.remove(url);
            return None;
        }
        Some(record.clone())
    }

    pub fn put(&mut self, url: &str, record: &ProblemRecord, now: DateTime<Utc>) {
        let mut record = record.clone();
        record.code = None;
        record.language = None;
        self.entries.insert(url.to_string(), (now, record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PageFieldExtractor {
    /// 带会话缓存的提取；缓存命中时只重新提取代码
    pub fn extract_cached(
        &self,
        cache: &mut PageCache,
        page: &PageSnapshot,
        options: &ExtractOptions,
        now: DateTime<Utc>,
    ) -> Result<ProblemRecord, SyncError> {
        let mut record = match cache.get(&page.url, now) {
            Some(cached) => {
                debug!("Page cache hit for {}", page.url);
                cached
            }
            None => {
                let fresh = self.extract_fields(page, now)?;
                cache.put(&page.url, &fresh, now);
                fresh
            }
        };

        if options.include_code {
            self.attach_code(&mut record, page, options);
        }
        Ok(record)
    }
}
