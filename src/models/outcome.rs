use std::fmt;

use serde::Serialize;

use crate::error::LookupError;
use crate::models::CaseRecord;

/// 可重试失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// 页面上找不到预期的元素
    ElementMissing(String),
    /// 验证码为空
    VerificationEmpty,
    /// 验证码格式错误（原始读数）
    VerificationMalformed(String),
    /// 站点拒绝了验证码
    VerificationRejected,
    /// 等待结果页面超时且页面状态不明确
    Timeout,
    /// 页面加载失败
    Navigation(String),
    /// 浏览器操作失败
    Driver(String),
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::ElementMissing(what) => write!(f, "找不到页面元素 {}", what),
            RetryReason::VerificationEmpty => write!(f, "验证码为空"),
            RetryReason::VerificationMalformed(raw) => write!(f, "验证码格式错误: {:?}", raw),
            RetryReason::VerificationRejected => write!(f, "站点拒绝了验证码"),
            RetryReason::Timeout => write!(f, "等待结果页面超时"),
            RetryReason::Navigation(msg) => write!(f, "页面加载失败: {}", msg),
            RetryReason::Driver(msg) => write!(f, "浏览器操作失败: {}", msg),
        }
    }
}

/// 一次提交尝试的结果
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(CaseRecord),
    Retryable(RetryReason),
    Terminal(LookupError),
}

/// 对外的检索结果：`{success: true, data}` 或 `{success: false, error}`
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CaseRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    pub fn success(record: CaseRecord) -> Self {
        Self {
            success: true,
            data: Some(record),
            error: None,
        }
    }

    pub fn failure(error: &LookupError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<CaseRecord, LookupError>> for SearchResult {
    fn from(result: Result<CaseRecord, LookupError>) -> Self {
        match result {
            Ok(record) => SearchResult::success(record),
            Err(e) => SearchResult::failure(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseFailure;

    #[test]
    fn failure_result_has_no_snapshot() {
        let err = LookupError::Parse(ParseFailure::new("<table>raw page</table>"));
        let json = serde_json::to_value(SearchResult::failure(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert!(!json["error"].as_str().unwrap().contains("raw page"));
    }

    #[test]
    fn retry_reason_reads_as_a_sentence() {
        let reason = RetryReason::VerificationMalformed("12a4".into());
        assert!(reason.to_string().contains("12a4"));
    }
}
