use serde::{Deserialize, Serialize};
use url::Url;

/// 字段缺失时的占位文本
pub const NOT_AVAILABLE: &str = "Not available";

/// 单个案件字段：要么取到了值，要么明确标记为缺失
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    Available(String),
    #[default]
    NotAvailable,
}

impl FieldValue {
    /// 规范化空白；清理后为空则视为缺失
    pub fn from_text(text: &str) -> Self {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() || normalized.eq_ignore_ascii_case(NOT_AVAILABLE) {
            FieldValue::NotAvailable
        } else {
            FieldValue::Available(normalized)
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FieldValue::Available(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Available(value) => value,
            FieldValue::NotAvailable => NOT_AVAILABLE,
        }
    }

    /// 已有值时保留，否则采用新值
    pub fn or(self, other: FieldValue) -> FieldValue {
        if self.is_available() {
            self
        } else {
            other
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(FieldValue::from_text(&text))
    }
}

/// 文档链接，`resolved_url` 总是绝对地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub display_text: String,
    pub resolved_url: Url,
}

/// 从结果页面提取出的案件记录
///
/// 只能由解析链在某个策略成功后构造，构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    parties: FieldValue,
    filing_date: FieldValue,
    hearing_date: FieldValue,
    document_links: Vec<DocumentLink>,
    #[serde(skip)]
    raw_snapshot: String,
    #[serde(skip)]
    strategy: &'static str,
}

impl CaseRecord {
    pub(crate) fn new(
        fields: CaseFields,
        document_links: Vec<DocumentLink>,
        raw_snapshot: impl Into<String>,
        strategy: &'static str,
    ) -> Self {
        Self {
            parties: fields.parties,
            filing_date: fields.filing_date,
            hearing_date: fields.hearing_date,
            document_links,
            raw_snapshot: raw_snapshot.into(),
            strategy,
        }
    }

    pub fn parties(&self) -> &FieldValue {
        &self.parties
    }

    pub fn filing_date(&self) -> &FieldValue {
        &self.filing_date
    }

    pub fn hearing_date(&self) -> &FieldValue {
        &self.hearing_date
    }

    pub fn document_links(&self) -> &[DocumentLink] {
        &self.document_links
    }

    /// 诊断用的原始页面，不会被序列化
    pub fn raw_snapshot(&self) -> &str {
        &self.raw_snapshot
    }

    /// 产出本记录的解析策略名称
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }
}

/// 解析策略填写的字段集合，缺省全部为缺失
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFields {
    pub parties: FieldValue,
    pub filing_date: FieldValue,
    pub hearing_date: FieldValue,
}

impl CaseFields {
    /// 至少取到一个字段
    pub fn any_available(&self) -> bool {
        self.parties.is_available()
            || self.filing_date.is_available()
            || self.hearing_date.is_available()
    }
}
