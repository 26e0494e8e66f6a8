use super::{
    assign, find_date, visible_body_lines, ExtractionStrategy, FieldKind, ResultPage, VERSUS_RE,
};
use crate::models::{CaseFields, CaseRecord, FieldValue};

/// 过短的行多半是按钮或导航文字
const MIN_LINE_LEN: usize = 10;

/// 兜底文本策略
///
/// 精度最低：逐行扫描可见文本（表头除外），按关键字和正则取值。必须找到当事人才算适用。
pub struct TextStrategy;

impl ExtractionStrategy for TextStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    fn try_extract(&self, page: &ResultPage<'_>) -> Option<CaseRecord> {
        let mut fields = CaseFields::default();

        for line in visible_body_lines(page.document()) {
            if line.chars().count() <= MIN_LINE_LEN {
                continue;
            }
            let lower = line.to_lowercase();

            if VERSUS_RE.is_match(&line) {
                assign(&mut fields, FieldKind::Parties, FieldValue::from_text(&line));
            } else if lower.contains("hearing") || lower.contains("next date") || lower.contains("listed") {
                if let Some(date) = find_date(&line) {
                    assign(&mut fields, FieldKind::HearingDate, FieldValue::from_text(date));
                }
            } else if lower.contains("filed") || lower.contains("filing") {
                if let Some(date) = find_date(&line) {
                    assign(&mut fields, FieldKind::FilingDate, FieldValue::from_text(date));
                }
            }
        }

        fields
            .parties
            .is_available()
            .then(|| page.record(fields, self.name()))
    }
}
