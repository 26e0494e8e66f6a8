//! 表单提交服务 - 业务能力层
//!
//! 只负责"一次"有界的提交尝试：填表 → 验证码 → 提交 → 等待结果页面 → 解析。
//! 是否重试由 `workflow::SearchFlow` 决定。

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{SelectOutcome, Session};
use crate::config::Config;
use crate::error::{LookupError, Result};
use crate::models::{AttemptOutcome, RetryReason, SearchCriteria};
use crate::services::extraction::{visible_lines, ExtractionChain};
use crate::services::verification::VerificationResolver;
use crate::utils::logging::truncate_text;

/// 站点明确表示查无此案
const NOT_FOUND_MESSAGES: &[&str] = &[
    "no record found",
    "no records found",
    "no case found",
    "no data found",
    "record not found",
    "case not found",
    "no matching records",
    "no data available in table",
];

/// 站点拒绝了验证码
const REJECTED_MESSAGES: &[&str] = &[
    "invalid captcha",
    "incorrect captcha",
    "wrong captcha",
    "captcha mismatch",
    "captcha does not match",
    "please enter valid captcha",
];

/// 按页面结构取值的策略；站点报告查无此案时只信任这些策略
const STRUCTURED_STRATEGIES: &[&str] = &["table", "block", "embedded"];

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("表格选择器"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("单元格选择器"));
static ANY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body *").expect("元素选择器"));
static RESULT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)result").expect("结果区域正则"));

/// 提交后页面所处的状态
#[derive(Debug, Clone, PartialEq, Eq)]
enum PageState {
    /// 还是提交前的页面，或看不出结果
    Pending,
    /// 站点拒绝验证码
    VerificationRejected,
    /// 站点报告查无此案
    NotFound(String),
    /// 出现了数据区域
    DataRegion,
}

pub struct SubmissionController {
    config: Config,
    verification: VerificationResolver,
    chain: ExtractionChain,
}

impl SubmissionController {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LookupError::Config(format!("base_url 无效: {}", e)))?;
        Ok(Self {
            config: config.clone(),
            verification: VerificationResolver::new(&config.selectors),
            chain: ExtractionChain::new(base_url),
        })
    }

    /// 一次完整的提交尝试
    pub async fn submit(&self, session: &mut Session, criteria: &SearchCriteria) -> AttemptOutcome {
        if let Err(e) = session.begin_submit() {
            return into_outcome(e);
        }

        if let Err(outcome) = self.fill_form(session, criteria).await {
            return outcome;
        }

        let challenge = match self.verification.resolve(session).await {
            Ok(challenge) => challenge,
            Err(e) => return into_outcome(e),
        };
        let Some(code) = challenge.verified() else {
            return AttemptOutcome::Retryable(if challenge.is_empty() {
                RetryReason::VerificationEmpty
            } else {
                RetryReason::VerificationMalformed(challenge.raw_text().trim().to_string())
            });
        };
        if let Err(e) = self.verification.apply(session, code).await {
            return AttemptOutcome::Retryable(RetryReason::ElementMissing(e.to_string()));
        }

        let before = match self.click_submit(session).await {
            Ok(before) => before,
            Err(outcome) => return outcome,
        };

        self.await_result(session, &before).await
    }

    /// 填写案件类型、编号和年份
    async fn fill_form(
        &self,
        session: &mut Session,
        criteria: &SearchCriteria,
    ) -> std::result::Result<(), AttemptOutcome> {
        let selectors = &self.config.selectors;
        let site_code = criteria.case_type().site_code();
        let driver = session.driver().map_err(into_outcome)?;

        match driver
            .select_option(&selectors.case_type, site_code)
            .await
            .map_err(driver_outcome)?
        {
            SelectOutcome::Selected(value) => debug!("案件类型 {} → option {}", site_code, value),
            SelectOutcome::NoSuchOption => {
                return Err(AttemptOutcome::Terminal(LookupError::Validation(format!(
                    "站点不提供案件类型 {}",
                    site_code
                ))))
            }
            SelectOutcome::NoSuchElement => return Err(missing(&selectors.case_type)),
        }

        if !driver
            .fill_field(&selectors.case_number, criteria.case_number())
            .await
            .map_err(driver_outcome)?
        {
            return Err(missing(&selectors.case_number));
        }

        let year = criteria.filing_year().to_string();
        match driver
            .select_option(&selectors.year, &year)
            .await
            .map_err(driver_outcome)?
        {
            SelectOutcome::Selected(_) => {}
            SelectOutcome::NoSuchOption => {
                return Err(AttemptOutcome::Terminal(LookupError::Validation(format!(
                    "站点不提供年份 {}",
                    year
                ))))
            }
            SelectOutcome::NoSuchElement => return Err(missing(&selectors.year)),
        }

        info!("已填写检索条件: {}", criteria);
        Ok(())
    }

    /// 点击第一个存在的提交按钮，返回点击前的页面用于判断页面是否变化
    async fn click_submit(&self, session: &mut Session) -> std::result::Result<String, AttemptOutcome> {
        let driver = session.driver().map_err(into_outcome)?;
        let before = driver.html().await.map_err(driver_outcome)?;

        for selector in &self.config.selectors.submit_buttons {
            if driver.click(selector).await.map_err(driver_outcome)? {
                info!("📤 已提交检索表单 ({})", selector);
                return Ok(before);
            }
        }
        Err(missing("提交按钮"))
    }

    /// 轮询页面直到出现结果、站点错误或超时
    async fn await_result(&self, session: &mut Session, before: &str) -> AttemptOutcome {
        let deadline = Instant::now() + self.config.result_wait_timeout();

        loop {
            sleep(self.config.poll_interval()).await;

            let html = match session.driver() {
                Ok(driver) => driver.html().await,
                Err(e) => return into_outcome(e),
            };

            match html {
                Ok(html) if html != before => {
                    if let Some(outcome) = self.inspect(&html) {
                        return outcome;
                    }
                }
                Ok(_) => debug!("页面尚未变化"),
                Err(e) => debug!("读取页面失败，继续等待: {}", e),
            }

            if Instant::now() >= deadline {
                warn!("等待结果页面超时 ({:?})", self.config.result_wait_timeout());
                return AttemptOutcome::Retryable(RetryReason::Timeout);
            }
        }
    }

    /// 判断结果页面；返回 `None` 表示继续等待
    fn inspect(&self, html: &str) -> Option<AttemptOutcome> {
        let state = classify_page(html);
        if state == PageState::VerificationRejected {
            warn!("站点拒绝了验证码");
            return Some(AttemptOutcome::Retryable(RetryReason::VerificationRejected));
        }

        match (self.chain.extract(html), state) {
            // 文本策略可能把提示页上的零散文字当成数据，站点的明确提示优先
            (Ok(record), PageState::NotFound(message))
                if !STRUCTURED_STRATEGIES.contains(&record.strategy()) =>
            {
                debug!("忽略 {} 策略的解析结果", record.strategy());
                return Some(not_found(message));
            }
            (Ok(record), _) => return Some(AttemptOutcome::Success(record)),
            (Err(_), PageState::NotFound(message)) => return Some(not_found(message)),
            (Err(failure), PageState::DataRegion) => {
                warn!("结果页面无法解析");
                debug!("页面快照: {}", truncate_text(failure.snapshot(), 2000));
                return Some(AttemptOutcome::Terminal(LookupError::Parse(failure)));
            }
            (Err(_), PageState::Pending | PageState::VerificationRejected) => {}
        }
        None
    }
}

fn classify_page(html: &str) -> PageState {
    let document = Html::parse_document(html);
    let text = visible_lines(&document).join("\n").to_lowercase();

    if let Some(message) = REJECTED_MESSAGES.iter().find(|m| text.contains(*m)) {
        debug!("匹配到验证码错误提示: {}", message);
        return PageState::VerificationRejected;
    }
    if let Some(message) = NOT_FOUND_MESSAGES.iter().find(|m| text.contains(*m)) {
        return PageState::NotFound((*message).to_string());
    }
    if has_data_region(&document) {
        return PageState::DataRegion;
    }
    PageState::Pending
}

/// 表单外带内容的表格，或 class/id 含 "result" 且有文字的元素
fn has_data_region(document: &Html) -> bool {
    let table_with_data = document.select(&TABLE_SELECTOR).any(|table| {
        !inside_form(table)
            && table
                .select(&CELL_SELECTOR)
                .any(|cell| cell.text().any(|t| !t.trim().is_empty()))
    });
    if table_with_data {
        return true;
    }

    document.select(&ANY_SELECTOR).any(|el| {
        let value = el.value();
        let named_result = value
            .attr("id")
            .into_iter()
            .chain(value.attr("class"))
            .any(|name| RESULT_NAME_RE.is_match(name));
        named_result && el.text().any(|t| !t.trim().is_empty())
    })
}

fn inside_form(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "form")
}

fn not_found(message: String) -> AttemptOutcome {
    info!("站点返回查无此案: {}", message);
    AttemptOutcome::Terminal(LookupError::NotFound(message))
}

fn missing(what: &str) -> AttemptOutcome {
    warn!("找不到页面元素: {}", what);
    AttemptOutcome::Retryable(RetryReason::ElementMissing(what.to_string()))
}

fn driver_outcome(err: crate::error::DriverError) -> AttemptOutcome {
    warn!("浏览器操作失败: {}", err);
    AttemptOutcome::Retryable(RetryReason::Driver(err.to_string()))
}

/// 把会话/验证码层的错误归入一次尝试的结果
fn into_outcome(err: LookupError) -> AttemptOutcome {
    match err {
        LookupError::Navigation(msg) => AttemptOutcome::Retryable(RetryReason::Navigation(msg)),
        LookupError::Verification(msg) => AttemptOutcome::Retryable(RetryReason::Driver(msg)),
        other => AttemptOutcome::Terminal(other),
    }
}
