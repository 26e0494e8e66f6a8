//! 结果页面解析链
//!
//! 按固定优先级依次尝试各个解析策略，第一个返回完整记录的策略胜出：
//!
//! 1. `table` - 带标签的数据表格
//! 2. `block` - 带语义 class/id 的容器
//! 3. `embedded` - 脚本中内嵌的 JSON
//! 4. `text` - 对可见文本做关键字/正则扫描
//!
//! 任何策略都不会编造字段：取不到的字段一律是 `FieldValue::NotAvailable`。

mod block;
mod embedded;
mod table;
mod text;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, info};
use url::Url;

use crate::error::ParseFailure;
use crate::models::{CaseFields, CaseRecord, DocumentLink, FieldValue};
use crate::services::documents::collect_document_links;

pub use block::BlockStrategy;
pub use embedded::EmbeddedDataStrategy;
pub use table::TableStrategy;
pub use text::TextStrategy;

/// 解析策略
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// 返回完整记录，或 `None` 表示本策略不适用
    fn try_extract(&self, page: &ResultPage<'_>) -> Option<CaseRecord>;
}

/// 解析一次后供所有策略共享的页面
pub struct ResultPage<'a> {
    html: &'a str,
    document: Html,
    base_url: &'a Url,
    links: Vec<DocumentLink>,
}

impl<'a> ResultPage<'a> {
    pub fn parse(html: &'a str, base_url: &'a Url) -> Self {
        let document = Html::parse_document(html);
        let links = collect_document_links(&document, base_url);
        Self {
            html,
            document,
            base_url,
            links,
        }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    pub fn base_url(&self) -> &Url {
        self.base_url
    }

    /// 页面上的文档链接（已去重、已补全为绝对地址）
    pub fn links(&self) -> &[DocumentLink] {
        &self.links
    }

    /// 用页面上的文档链接构造记录
    pub fn record(&self, fields: CaseFields, strategy: &'static str) -> CaseRecord {
        CaseRecord::new(fields, self.links.clone(), self.html, strategy)
    }

    pub fn record_with_links(
        &self,
        fields: CaseFields,
        links: Vec<DocumentLink>,
        strategy: &'static str,
    ) -> CaseRecord {
        CaseRecord::new(fields, links, self.html, strategy)
    }
}

/// 有序的解析链
pub struct ExtractionChain {
    base_url: Url,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionChain {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            strategies: vec![
                Box::new(TableStrategy),
                Box::new(BlockStrategy),
                Box::new(EmbeddedDataStrategy),
                Box::new(TextStrategy),
            ],
        }
    }

    /// 策略名称，按尝试顺序
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, html: &str) -> Result<CaseRecord, ParseFailure> {
        let page = ResultPage::parse(html, &self.base_url);

        for strategy in &self.strategies {
            match strategy.try_extract(&page) {
                Some(record) => {
                    info!("✓ 解析成功，使用策略: {}", strategy.name());
                    return Ok(record);
                }
                None => debug!("解析策略 {} 不适用", strategy.name()),
            }
        }

        Err(ParseFailure::new(html))
    }
}

// ========== 策略共用的辅助函数 ==========

/// 案件字段种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Parties,
    FilingDate,
    HearingDate,
}

/// 根据标签文字判断字段种类
pub(crate) fn classify_label(label: &str) -> Option<FieldKind> {
    let label = label.to_lowercase();
    if label.contains("hearing") || label.contains("next date") || label.contains("listing") {
        Some(FieldKind::HearingDate)
    } else if label.contains("filing") || label.contains("filed") || label.contains("registration date") {
        Some(FieldKind::FilingDate)
    } else if label.contains("parties")
        || label.contains("party")
        || label.contains("petitioner")
        || label.contains("plaintiff")
        || label.contains("appellant")
        || VERSUS_RE.is_match(&label)
    {
        Some(FieldKind::Parties)
    } else {
        None
    }
}

/// 填入字段，已有值时保留先出现的值
pub(crate) fn assign(fields: &mut CaseFields, kind: FieldKind, value: FieldValue) {
    let slot = match kind {
        FieldKind::Parties => &mut fields.parties,
        FieldKind::FilingDate => &mut fields.filing_date,
        FieldKind::HearingDate => &mut fields.hearing_date,
    };
    *slot = std::mem::take(slot).or(value);
}

pub(crate) static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[-/.]\d{1,2}[-/.]\d{4}\b|\b\d{1,2}\s+[A-Za-z]{3,9},?\s+\d{4}\b")
        .expect("日期正则")
});

pub(crate) static VERSUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(vs\.?|versus|v/s)(\s|$)").expect("当事人正则"));

/// 取文本中的第一个日期
pub(crate) fn find_date(text: &str) -> Option<&str> {
    DATE_RE.find(text).map(|m| m.as_str())
}

/// 日期字段：有日期格式时只取日期，否则保留原文
pub(crate) fn date_value(text: &str) -> FieldValue {
    match find_date(text) {
        Some(date) => FieldValue::from_text(date),
        None => FieldValue::from_text(text),
    }
}

/// 元素内文字，空白已规范化
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "br", "dd", "div", "dl", "dt", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table",
    "tbody", "td", "th", "thead", "tr", "ul",
];

const HIDDEN_TAGS: &[&str] = &["head", "noscript", "script", "style", "template"];

/// 表头单元格：列名不是数据
const HEADER_TAGS: &[&str] = &["th", "thead"];

/// 页面可见文本，按块级元素分行，去掉空行
pub(crate) fn visible_lines(document: &Html) -> Vec<String> {
    lines_without(document, &[])
}

/// 同 [`visible_lines`]，但不含表头文字
pub(crate) fn visible_body_lines(document: &Html) -> Vec<String> {
    lines_without(document, HEADER_TAGS)
}

fn lines_without(document: &Html, skipped: &[&str]) -> Vec<String> {
    let mut out = String::new();
    collect_visible_text(document.root_element(), skipped, &mut out);
    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn collect_visible_text(element: ElementRef<'_>, skipped: &[&str], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) || skipped.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, skipped, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NOT_AVAILABLE;

    fn chain() -> ExtractionChain {
        ExtractionChain::new(Url::parse("https://delhihighcourt.nic.in/").unwrap())
    }

    #[test]
    fn strategies_run_in_fixed_order() {
        assert_eq!(
            chain().strategy_names(),
            vec!["table", "block", "embedded", "text"]
        );
    }

    #[test]
    fn table_wins_when_block_layout_also_matches() {
        let html = r#"
            <html><body>
              <div class="case-parties">Parties: BLOCK PETITIONER vs BLOCK RESPONDENT</div>
              <table>
                <tr><td>Parties</td><td>TABLE PETITIONER vs TABLE RESPONDENT</td></tr>
                <tr><td>Filing Date</td><td>01/02/2025</td></tr>
              </table>
            </body></html>
        "#;
        let record = chain().extract(html).unwrap();
        assert_eq!(record.strategy(), "table");
        assert_eq!(
            record.parties().as_str(),
            "TABLE PETITIONER vs TABLE RESPONDENT"
        );
    }

    #[test]
    fn unmatched_page_is_parse_failure_with_snapshot() {
        let html = "<html><body><p>Welcome to the portal.</p></body></html>";
        let failure = chain().extract(html).unwrap_err();
        assert_eq!(failure.snapshot(), html);
    }

    #[test]
    fn missing_fields_are_not_available() {
        let html = r#"<table><tr><td>Petitioner</td><td>A vs B</td></tr></table>"#;
        let record = chain().extract(html).unwrap();
        assert_eq!(record.filing_date(), &FieldValue::NotAvailable);
        assert_eq!(record.hearing_date().as_str(), NOT_AVAILABLE);
        assert!(record.document_links().is_empty());
    }

    #[test]
    fn visible_lines_skip_scripts_and_split_blocks() {
        let document = Html::parse_document(
            "<html><head><title>T</title></head><body><p>one <b>two</b></p><script>var x = 1;</script><div>three</div></body></html>",
        );
        assert_eq!(visible_lines(&document), vec!["one two", "three"]);
    }

    #[test]
    fn body_lines_leave_out_header_cells() {
        let document = Html::parse_document(
            "<table><thead><tr><th>Petitioner Vs. Respondent</th></tr></thead><tbody><tr><th>Row</th><td>A vs B</td></tr></tbody></table>",
        );
        assert_eq!(visible_body_lines(&document), vec!["A vs B"]);
        assert_eq!(
            visible_lines(&document),
            vec!["Petitioner Vs. Respondent", "Row", "A vs B"]
        );
    }

    #[test]
    fn labels_are_classified() {
        assert_eq!(classify_label("Next Hearing Date"), Some(FieldKind::HearingDate));
        assert_eq!(classify_label("Date of Filing"), Some(FieldKind::FilingDate));
        assert_eq!(classify_label("Petitioner/Respondent"), Some(FieldKind::Parties));
        assert_eq!(classify_label("Court No."), None);
    }

    #[test]
    fn dates_are_found_in_text() {
        assert_eq!(find_date("Filed on 12/03/2025 at registry"), Some("12/03/2025"));
        assert_eq!(find_date("Listed 5 March 2025"), Some("5 March 2025"));
        assert_eq!(find_date("no date"), None);
    }
}
