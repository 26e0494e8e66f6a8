use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use serde_json::{Map, Value as JsonValue};

use super::{date_value, ExtractionStrategy, ResultPage};
use crate::models::{CaseFields, CaseRecord, DocumentLink, FieldValue};
use crate::services::documents::{resolve_document_url, DEFAULT_LINK_TEXT};

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("脚本选择器"));
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("JSON 正则"));

const PARTY_KEYS: &[&str] = &["parties", "party", "party_names", "partyNames"];
const FILING_KEYS: &[&str] = &["filing_date", "filingDate", "date_of_filing", "filed_on"];
const HEARING_KEYS: &[&str] = &[
    "hearing_date",
    "hearingDate",
    "next_hearing_date",
    "nextHearingDate",
    "next_date",
];
const LINK_KEYS: &[&str] = &["pdf_links", "pdfLinks", "documents", "orders", "links"];
const NESTED_KEYS: &[&str] = &["case", "caseDetails", "case_details", "data", "result"];

/// 内嵌数据策略
///
/// 查找脚本中携带的 JSON（`application/json`、`ld+json` 或 `var x = {...}` 形式），直接映射字段。
pub struct EmbeddedDataStrategy;

impl ExtractionStrategy for EmbeddedDataStrategy {
    fn name(&self) -> &'static str {
        "embedded"
    }

    fn try_extract(&self, page: &ResultPage<'_>) -> Option<CaseRecord> {
        for script in page.document().select(&SCRIPT_SELECTOR) {
            let source = script.text().collect::<String>();
            let lower = source.to_lowercase();
            if !(lower.contains("case") || lower.contains("parties") || lower.contains("filing")) {
                continue;
            }

            let Some(payload) = parse_payload(&source) else {
                continue;
            };
            let Some(object) = case_object(&payload) else {
                continue;
            };

            let fields = CaseFields {
                parties: parties_value(object),
                filing_date: string_field(object, FILING_KEYS).map_or_else(FieldValue::default, |s| date_value(&s)),
                hearing_date: string_field(object, HEARING_KEYS).map_or_else(FieldValue::default, |s| date_value(&s)),
            };
            if !fields.any_available() {
                continue;
            }

            let links = embedded_links(object, page);
            let links = if links.is_empty() {
                page.links().to_vec()
            } else {
                links
            };
            return Some(page.record_with_links(fields, links, self.name()));
        }
        None
    }
}

fn parse_payload(source: &str) -> Option<JsonValue> {
    let trimmed = source.trim();
    if let Ok(value) = serde_json::from_str::<JsonValue>(trimmed) {
        return Some(value);
    }
    let candidate = JSON_OBJECT_RE.find(trimmed)?;
    serde_json::from_str(candidate.as_str()).ok()
}

/// 顶层对象带有案件字段时直接使用，否则查找常见的嵌套键
fn case_object(payload: &JsonValue) -> Option<&Map<String, JsonValue>> {
    let object = payload.as_object()?;
    if has_case_keys(object) {
        return Some(object);
    }
    NESTED_KEYS
        .iter()
        .filter_map(|key| object.get(*key)?.as_object())
        .find(|nested| has_case_keys(nested))
}

fn has_case_keys(object: &Map<String, JsonValue>) -> bool {
    PARTY_KEYS
        .iter()
        .chain(FILING_KEYS)
        .chain(HEARING_KEYS)
        .any(|key| object.contains_key(*key))
}

fn string_field(object: &Map<String, JsonValue>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// 当事人可能是字符串、字符串数组，或 `{petitioner, respondent}` 对象
fn parties_value(object: &Map<String, JsonValue>) -> FieldValue {
    let Some(value) = PARTY_KEYS.iter().find_map(|key| object.get(*key)) else {
        return FieldValue::NotAvailable;
    };
    match value {
        JsonValue::String(s) => FieldValue::from_text(s),
        JsonValue::Array(items) => {
            let names: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            FieldValue::from_text(&names.join(" vs "))
        }
        JsonValue::Object(sides) => {
            let petitioner = sides.get("petitioner").and_then(|v| v.as_str());
            let respondent = sides.get("respondent").and_then(|v| v.as_str());
            match (petitioner, respondent) {
                (Some(p), Some(r)) => FieldValue::from_text(&format!("{} vs {}", p, r)),
                (Some(one), None) | (None, Some(one)) => FieldValue::from_text(one),
                (None, None) => FieldValue::NotAvailable,
            }
        }
        _ => FieldValue::NotAvailable,
    }
}

/// 内嵌的文档链接：字符串或 `{url|href, text|title}` 对象
fn embedded_links(object: &Map<String, JsonValue>, page: &ResultPage<'_>) -> Vec<DocumentLink> {
    let Some(items) = LINK_KEYS
        .iter()
        .find_map(|key| object.get(*key)?.as_array())
    else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for item in items {
        let (href, text) = match item {
            JsonValue::String(href) => (href.as_str(), None),
            JsonValue::Object(link) => {
                let Some(href) = ["url", "href"]
                    .iter()
                    .find_map(|key| link.get(*key)?.as_str())
                else {
                    continue;
                };
                let text = ["text", "title", "name"]
                    .iter()
                    .find_map(|key| link.get(*key)?.as_str());
                (href, text)
            }
            _ => continue,
        };

        let Some(resolved_url) = resolve_document_url(page.base_url(), href) else {
            continue;
        };
        if !seen.insert(resolved_url.as_str().to_string()) {
            continue;
        }
        let display_text = text
            .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_LINK_TEXT.to_string());
        links.push(DocumentLink {
            display_text,
            resolved_url,
        });
    }
    links
}
