use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{
    assign, classify_label, date_value, element_text, find_date, ExtractionStrategy, FieldKind,
    ResultPage, VERSUS_RE,
};
use crate::models::{CaseFields, CaseRecord, FieldValue};

static CONTAINER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div, span, section, p, li, article").expect("容器选择器")
});
static DT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl dt").expect("定义列表选择器"));
static SEMANTIC_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)case|info|detail|part|hearing|filing").expect("容器名称正则")
});

/// 容器策略
///
/// 在没有数据表格时，查找 class/id 带有语义的容器（如 `case-details`、`party-name`），
/// 以及 `<dl>` 中的 `<dt>/<dd>` 标签对。
pub struct BlockStrategy;

impl ExtractionStrategy for BlockStrategy {
    fn name(&self) -> &'static str {
        "block"
    }

    fn try_extract(&self, page: &ResultPage<'_>) -> Option<CaseRecord> {
        let mut fields = CaseFields::default();

        for (label, value) in definition_pairs(page) {
            if let Some(kind) = classify_label(&label) {
                assign(&mut fields, kind, labeled_value(kind, &value));
            }
        }

        for container in page
            .document()
            .select(&CONTAINER_SELECTOR)
            .filter(|el| is_semantic(*el) && !has_semantic_descendant(*el))
        {
            read_container(&element_text(container), &mut fields);
        }

        fields
            .any_available()
            .then(|| page.record(fields, self.name()))
    }
}

fn is_semantic(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value
        .attr("class")
        .into_iter()
        .chain(value.attr("id"))
        .any(|name| SEMANTIC_NAME_RE.is_match(name))
}

/// 只读取最内层的语义容器，避免外层容器把所有字段拼成一段文本
fn has_semantic_descendant(element: ElementRef<'_>) -> bool {
    element
        .select(&CONTAINER_SELECTOR)
        .any(is_semantic)
}

fn definition_pairs(page: &ResultPage<'_>) -> Vec<(String, String)> {
    page.document()
        .select(&DT_SELECTOR)
        .filter_map(|dt| {
            let dd = dt
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .next()
                .filter(|el| el.value().name() == "dd")?;
            Some((element_text(dt), element_text(dd)))
        })
        .collect()
}

/// 解析单个容器文本："标签: 值" 形式按标签归类，否则按内容关键字判断
fn read_container(text: &str, fields: &mut CaseFields) {
    if text.is_empty() {
        return;
    }

    if let Some((label, value)) = text.split_once(':') {
        if let Some(kind) = classify_label(label) {
            assign(fields, kind, labeled_value(kind, value));
            return;
        }
    }

    let lower = text.to_lowercase();
    if VERSUS_RE.is_match(text) {
        assign(fields, FieldKind::Parties, FieldValue::from_text(text));
    } else if lower.contains("hearing") || lower.contains("next date") {
        if let Some(date) = find_date(text) {
            assign(fields, FieldKind::HearingDate, FieldValue::from_text(date));
        }
    } else if lower.contains("filed") || lower.contains("filing") {
        if let Some(date) = find_date(text) {
            assign(fields, FieldKind::FilingDate, FieldValue::from_text(date));
        }
    }
}

fn labeled_value(kind: FieldKind, value: &str) -> FieldValue {
    match kind {
        FieldKind::Parties => FieldValue::from_text(value),
        FieldKind::FilingDate | FieldKind::HearingDate => date_value(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn extract(html: &str) -> Option<CaseRecord> {
        let base = Url::parse("https://delhihighcourt.nic.in/").unwrap();
        let page = ResultPage::parse(html, &base);
        BlockStrategy.try_extract(&page)
    }

    #[test]
    fn labeled_containers_are_read() {
        let html = r#"
            <div class="case-details">
              <div class="party-info">Parties: RAM KUMAR Vs. UNION OF INDIA</div>
              <span class="filing-date">Filing Date: 14/07/2025</span>
              <span class="hearing">Next Hearing: 02/09/2025</span>
            </div>
        "#;
        let record = extract(html).unwrap();
        assert_eq!(record.parties().as_str(), "RAM KUMAR Vs. UNION OF INDIA");
        assert_eq!(record.filing_date().as_str(), "14/07/2025");
        assert_eq!(record.hearing_date().as_str(), "02/09/2025");
        assert_eq!(record.strategy(), "block");
    }

    #[test]
    fn unlabeled_container_is_classified_by_content() {
        let html = r#"
            <div id="caseInfo">ANITA SHARMA versus STATE</div>
            <p class="case-meta">Case was filed on 10-10-2023</p>
        "#;
        let record = extract(html).unwrap();
        assert_eq!(record.parties().as_str(), "ANITA SHARMA versus STATE");
        assert_eq!(record.filing_date().as_str(), "10-10-2023");
        assert!(!record.hearing_date().is_available());
    }

    #[test]
    fn definition_list_pairs_are_read() {
        let html = r#"
            <dl>
              <dt>Petitioner</dt><dd>X vs Y</dd>
              <dt>Next Date</dt><dd>01.12.2025</dd>
            </dl>
        "#;
        let record = extract(html).unwrap();
        assert_eq!(record.parties().as_str(), "X vs Y");
        assert_eq!(record.hearing_date().as_str(), "01.12.2025");
    }

    #[test]
    fn plain_page_is_not_applicable() {
        assert!(extract("<div class=\"banner\">Delhi High Court</div>").is_none());
        assert!(extract("<div class=\"case-box\">Nothing useful here</div>").is_none());
    }
}
