use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::models::RetryReason;

/// 检索引擎错误类型
///
/// 跨越 `CaseLookup` 边界的只有终止类错误；可重试的错误在 `SearchFlow` 内部被消化。
#[derive(Debug, Error)]
pub enum LookupError {
    /// 输入不合法或案件类型无法映射（终止，不重试）
    #[error("输入校验失败: {0}")]
    Validation(String),

    /// 页面加载失败（可重试）
    #[error("页面导航失败: {0}")]
    Navigation(String),

    /// 验证码不可读或格式错误
    #[error("验证码处理失败: {0}")]
    Verification(String),

    /// 重试次数耗尽，携带最后一次失败原因
    #[error("已尝试 {attempts} 次仍失败，最后原因: {last_reason}")]
    ExhaustedRetries {
        attempts: u32,
        last_reason: RetryReason,
    },

    /// 所有解析策略都不适用
    #[error("{0}")]
    Parse(ParseFailure),

    /// 站点明确返回查无此案
    #[error("法院网站返回: {0}")]
    NotFound(String),

    /// 超过整体请求时限
    #[error("请求超过时限 ({0:?})")]
    DeadlineExceeded(Duration),

    /// 文档下载失败
    #[error("文档下载失败: {0}")]
    Download(#[from] DownloadError),

    /// 浏览器启动或协议错误
    #[error("浏览器错误: {0}")]
    Browser(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),
}

impl LookupError {
    /// 是否属于可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Navigation(_) | LookupError::Verification(_))
    }

    /// 解析失败时保留的原始页面快照，只用于内部诊断
    pub fn diagnostic_snapshot(&self) -> Option<&str> {
        match self {
            LookupError::Parse(failure) => Some(failure.snapshot()),
            _ => None,
        }
    }
}

/// 解析失败：保存原始页面以供诊断
///
/// `Display` 不包含快照内容，避免原始 HTML 泄漏给调用方。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    snapshot: String,
}

impl ParseFailure {
    pub fn new(snapshot: impl Into<String>) -> Self {
        Self {
            snapshot: snapshot.into(),
        }
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "无法从结果页面解析案件信息")
    }
}

impl std::error::Error for ParseFailure {}

/// 文档下载错误
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("下载超时 ({0:?})")]
    Timeout(Duration),

    #[error("文件超过大小上限 {limit_bytes} 字节")]
    TooLarge {
        limit_bytes: u64,
        declared_bytes: Option<u64>,
    },

    #[error("不是文档类型: {0}")]
    BadContentType(String),

    #[error("服务器返回状态码 {0}")]
    Status(u16),

    #[error("不支持的链接协议: {0}")]
    UnsupportedScheme(String),

    #[error("网络请求失败: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Transport(err.to_string())
    }
}

/// 浏览器能力层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("浏览器操作超时 ({0:?})")]
    Timeout(Duration),

    #[error("浏览器协议错误: {0}")]
    Protocol(String),
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Protocol(err.to_string())
    }
}

/// 检索结果类型
pub type Result<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_display_hides_snapshot() {
        let err = LookupError::Parse(ParseFailure::new("<html><body>secret</body></html>"));
        let msg = err.to_string();
        assert!(!msg.contains("secret"));
        assert_eq!(
            err.diagnostic_snapshot(),
            Some("<html><body>secret</body></html>")
        );
    }

    #[test]
    fn exhausted_retries_carries_last_reason() {
        let err = LookupError::ExhaustedRetries {
            attempts: 3,
            last_reason: RetryReason::Timeout,
        };
        assert!(err.to_string().contains('3'));
        assert!(!err.is_retryable());
    }
}
