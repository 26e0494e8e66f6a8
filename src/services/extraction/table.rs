use std::sync::LazyLock;

use scraper::Selector;

use super::{assign, classify_label, date_value, element_text, ExtractionStrategy, FieldKind, ResultPage};
use crate::models::{CaseFields, CaseRecord, FieldValue};

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr").expect("表格行选择器"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("单元格选择器"));

/// 表格策略
///
/// 两种布局：
/// - 列表布局：某一行是表头（含 "Case No"），其后的行按列取值
/// - 键值布局：每行第一格是标签，第二格是值
pub struct TableStrategy;

impl ExtractionStrategy for TableStrategy {
    fn name(&self) -> &'static str {
        "table"
    }

    fn try_extract(&self, page: &ResultPage<'_>) -> Option<CaseRecord> {
        let rows: Vec<Vec<String>> = page
            .document()
            .select(&ROW_SELECTOR)
            .map(|row| row.select(&CELL_SELECTOR).map(element_text).collect())
            .filter(|cells: &Vec<String>| !cells.is_empty())
            .collect();

        if rows.is_empty() {
            return None;
        }

        let header_idx = rows.iter().position(|cells| {
            cells
                .iter()
                .any(|cell| cell.to_lowercase().contains("case no"))
        });

        let fields = match header_idx {
            Some(idx) => columns_to_fields(&rows[idx], &rows[idx + 1..]),
            None => pairs_to_fields(&rows),
        };

        fields
            .any_available()
            .then(|| page.record(fields, self.name()))
    }
}

/// 列表布局：根据表头定位列，取第一行有数据的记录
fn columns_to_fields(header: &[String], data_rows: &[Vec<String>]) -> CaseFields {
    let columns: Vec<(usize, FieldKind)> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, label)| classify_label(label).map(|kind| (idx, kind)))
        .collect();

    let mut fields = CaseFields::default();
    if columns.is_empty() {
        return fields;
    }

    for row in data_rows {
        for &(idx, kind) in &columns {
            if let Some(cell) = row.get(idx) {
                assign(&mut fields, kind, field_value(kind, cell));
            }
        }
        if fields.any_available() {
            break;
        }
    }
    fields
}

/// 键值布局
fn pairs_to_fields(rows: &[Vec<String>]) -> CaseFields {
    let mut fields = CaseFields::default();
    for row in rows.iter().filter(|cells| cells.len() >= 2) {
        if let Some(kind) = classify_label(&row[0]) {
            assign(&mut fields, kind, field_value(kind, &row[1]));
        }
    }
    fields
}

fn field_value(kind: FieldKind, cell: &str) -> FieldValue {
    match kind {
        FieldKind::Parties => FieldValue::from_text(cell),
        FieldKind::FilingDate | FieldKind::HearingDate => date_value(cell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn extract(html: &str) -> Option<CaseRecord> {
        let base = Url::parse("https://delhihighcourt.nic.in/").unwrap();
        let page = ResultPage::parse(html, &base);
        TableStrategy.try_extract(&page)
    }

    #[test]
    fn header_layout_maps_columns() {
        let html = r#"
            <table>
              <tr><th>S.No.</th><th>Case No.</th><th>Parties</th><th>Filing Date</th><th>Next Hearing</th></tr>
              <tr><td>1</td><td>W.P.(C) 11199/2025</td><td>RAM KUMAR VS UNION OF INDIA</td><td>14/07/2025</td><td>02/09/2025</td></tr>
              <tr><td>2</td><td>W.P.(C) 11200/2025</td><td>OTHER VS OTHER</td><td>15/07/2025</td><td></td></tr>
            </table>
        "#;
        let record = extract(html).unwrap();
        assert_eq!(record.parties().as_str(), "RAM KUMAR VS UNION OF INDIA");
        assert_eq!(record.filing_date().as_str(), "14/07/2025");
        assert_eq!(record.hearing_date().as_str(), "02/09/2025");
    }

    #[test]
    fn key_value_layout_keeps_first_value() {
        let html = r#"
            <table>
              <tr><td>Petitioner</td><td>FIRST vs SECOND</td></tr>
              <tr><td>Parties</td><td>IGNORED vs IGNORED</td></tr>
              <tr><td>Date of Filing</td><td>Filed on 03-01-2024 (online)</td></tr>
              <tr><td>Court No.</td><td>12</td></tr>
            </table>
        "#;
        let record = extract(html).unwrap();
        assert_eq!(record.parties().as_str(), "FIRST vs SECOND");
        assert_eq!(record.filing_date().as_str(), "03-01-2024");
        assert!(!record.hearing_date().is_available());
    }

    #[test]
    fn unlabeled_table_is_not_applicable() {
        let html = "<table><tr><td>Court No.</td><td>12</td></tr></table>";
        assert!(extract(html).is_none());
        assert!(extract("<div>no table</div>").is_none());
    }

    #[test]
    fn header_without_data_rows_is_not_applicable() {
        let html = "<table><tr><th>Case No.</th><th>Parties</th></tr></table>";
        assert!(extract(html).is_none());
    }
}
