use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::LookupError;

/// 程序配置
///
/// 构建后不可变，按值注入到各个组件中。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 站点根地址，用于补全相对链接
    pub base_url: String,
    /// 案号检索页面
    pub search_url: String,
    /// 重试前的基础等待秒数，实际等待在 [delay, 2*delay] 之间随机
    pub scraping_delay_secs: f64,
    /// 单次请求最多尝试次数
    pub max_retries: u32,
    /// 单次请求的整体时限（秒）
    pub request_timeout_secs: u64,
    /// 每分钟允许的检索数
    pub requests_per_minute: u32,
    /// 每小时允许的检索数
    pub requests_per_hour: u32,
    /// 文档下载时限（秒）
    pub pdf_download_timeout_secs: u64,
    /// 文档大小上限（MB）
    pub max_pdf_size_mb: u64,
    /// 页面加载时限（秒）
    pub navigation_timeout_secs: u64,
    /// 提交后等待结果页面的时限（毫秒）
    pub result_wait_timeout_ms: u64,
    /// 轮询结果页面的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 同时存在的浏览器会话上限
    pub max_concurrent_sessions: usize,
    /// 浏览器可执行文件路径，为空时由 chromiumoxide 自动查找
    pub chrome_executable: Option<String>,
    /// 是否无头模式
    pub headless: bool,
    /// 查询结果记录文件
    pub outcome_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub verification: VerificationPolicy,
    pub selectors: SiteSelectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://delhihighcourt.nic.in/".to_string(),
            search_url: "https://delhihighcourt.nic.in/app/case-number".to_string(),
            scraping_delay_secs: 1.0,
            max_retries: 3,
            request_timeout_secs: 60,
            requests_per_minute: 10,
            requests_per_hour: 100,
            pdf_download_timeout_secs: 30,
            max_pdf_size_mb: 50,
            navigation_timeout_secs: 15,
            result_wait_timeout_ms: 15_000,
            poll_interval_ms: 500,
            max_concurrent_sessions: 2,
            chrome_executable: None,
            headless: true,
            outcome_log_file: "query_outcomes.jsonl".to_string(),
            verbose_logging: false,
            verification: VerificationPolicy::default(),
            selectors: SiteSelectors::default(),
        }
    }
}

/// 验证码为空 / 格式错误时的处理策略
///
/// `None` 表示一直按可重试处理；`Some(n)` 表示连续出现 n 次后终止。
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerificationPolicy {
    pub empty_limit: Option<u32>,
    pub malformed_limit: Option<u32>,
}

/// 检索页面上的元素选择器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub case_type: String,
    pub case_number: String,
    pub year: String,
    pub captcha_text: String,
    /// 验证码输入框，按顺序尝试
    pub captcha_inputs: Vec<String>,
    /// 提交按钮，按顺序尝试
    pub submit_buttons: Vec<String>,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            case_type: "select[name='case_type']".to_string(),
            case_number: "input[name='case_number']".to_string(),
            year: "select[name='year']".to_string(),
            captcha_text: "#captcha-code".to_string(),
            captcha_inputs: vec![
                "input[name='captcha']".to_string(),
                "input[placeholder*='captcha' i]".to_string(),
                "input[id*='captcha']".to_string(),
            ],
            submit_buttons: vec![
                "button#search".to_string(),
                "input[type='submit']".to_string(),
                "button[type='submit']".to_string(),
                "input[name='submit']".to_string(),
                "input[value='Search']".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            base_url: env_or("BASE_URL", default.base_url),
            search_url: env_or("SEARCH_URL", default.search_url),
            scraping_delay_secs: env_parse("SCRAPING_DELAY", default.scraping_delay_secs),
            max_retries: env_parse("MAX_RETRIES", default.max_retries),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT", default.request_timeout_secs),
            requests_per_minute: env_parse("REQUESTS_PER_MINUTE", default.requests_per_minute),
            requests_per_hour: env_parse("REQUESTS_PER_HOUR", default.requests_per_hour),
            pdf_download_timeout_secs: env_parse(
                "PDF_DOWNLOAD_TIMEOUT",
                default.pdf_download_timeout_secs,
            ),
            max_pdf_size_mb: env_parse("MAX_PDF_SIZE_MB", default.max_pdf_size_mb),
            navigation_timeout_secs: env_parse(
                "NAVIGATION_TIMEOUT",
                default.navigation_timeout_secs,
            ),
            result_wait_timeout_ms: env_parse(
                "RESULT_WAIT_TIMEOUT_MS",
                default.result_wait_timeout_ms,
            ),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", default.poll_interval_ms),
            max_concurrent_sessions: env_parse(
                "MAX_CONCURRENT_SESSIONS",
                default.max_concurrent_sessions,
            ),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            headless: env_parse("HEADLESS", default.headless),
            outcome_log_file: env_or("OUTCOME_LOG_FILE", default.outcome_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
            verification: VerificationPolicy {
                empty_limit: std::env::var("VERIFICATION_EMPTY_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .or(default.verification.empty_limit),
                malformed_limit: std::env::var("VERIFICATION_MALFORMED_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .or(default.verification.malformed_limit),
            },
            selectors: default.selectors,
        }
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), LookupError> {
        if self.max_retries == 0 {
            return Err(LookupError::Config("max_retries 必须大于 0".to_string()));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(LookupError::Config(
                "max_concurrent_sessions 必须大于 0".to_string(),
            ));
        }
        if !self.scraping_delay_secs.is_finite() || self.scraping_delay_secs < 0.0 {
            return Err(LookupError::Config(format!(
                "scraping_delay_secs 无效: {}",
                self.scraping_delay_secs
            )));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| LookupError::Config(format!("base_url 无效 ({}): {}", self.base_url, e)))?;
        url::Url::parse(&self.search_url).map_err(|e| {
            LookupError::Config(format!("search_url 无效 ({}): {}", self.search_url, e))
        })?;
        Ok(())
    }

    pub fn scraping_delay(&self) -> Duration {
        Duration::from_secs_f64(self.scraping_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn result_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.result_wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pdf_download_timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_download_timeout_secs)
    }

    pub fn max_pdf_size_bytes(&self) -> u64 {
        self.max_pdf_size_mb.saturating_mul(1024 * 1024)
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.max_pdf_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.verification, VerificationPolicy::default());
    }

    #[test]
    fn zero_retries_is_rejected() {
        let config = Config {
            max_retries: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LookupError::Config(_))));
    }

    #[test]
    fn toml_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
max_retries = 5
scraping_delay_secs = 0.0

[verification]
empty_limit = 2

[selectors]
captcha_text = "#code"
"##
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.scraping_delay(), Duration::ZERO);
        assert_eq!(config.verification.empty_limit, Some(2));
        assert_eq!(config.verification.malformed_limit, None);
        assert_eq!(config.selectors.captcha_text, "#code");
        assert_eq!(config.selectors.case_number, "input[name='case_number']");
        assert_eq!(config.request_timeout_secs, 60);
    }
}
