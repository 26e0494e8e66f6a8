//! 案件检索入口 - 编排层
//!
//! ## 职责
//!
//! 1. **参数校验**：案件类型无法映射时直接返回，不启动浏览器
//! 2. **准入控制**：`Semaphore` 限制同时存在的会话数，滑动窗口限制检索频率
//! 3. **资源管理**：每个请求独占一个会话，无论结果如何都在返回前关闭
//! 4. **整体时限**：超过 `request_timeout` 立即取消当前步骤，不再重试
//! 5. **结果记录**：每个请求写一次结果记录

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{BrowserLauncher, Session};
use crate::config::Config;
use crate::error::{LookupError, Result};
use crate::models::{CaseRecord, SearchCriteria, SearchResult};
use crate::orchestrator::rate_limiter::RateLimiter;
use crate::services::{DocumentResolver, DownloadedDocument, OutcomeRecorder, OutcomeStatus};
use crate::utils::logging::truncate_text;
use crate::workflow::{SearchCtx, SearchFlow};

/// 关闭浏览器的宽限时间，超时后放弃等待，浏览器句柄随会话释放
const CLOSE_GRACE: Duration = Duration::from_secs(5);

pub struct CaseLookup {
    config: Config,
    launcher: Arc<dyn BrowserLauncher>,
    flow: SearchFlow,
    documents: DocumentResolver,
    recorder: Arc<dyn OutcomeRecorder>,
    sessions: Semaphore,
    limiter: RateLimiter,
    next_id: AtomicU64,
}

impl CaseLookup {
    pub fn new(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            flow: SearchFlow::new(&config)?,
            documents: DocumentResolver::new(&config)?,
            sessions: Semaphore::new(config.max_concurrent_sessions),
            limiter: RateLimiter::per_minute_and_hour(
                config.requests_per_minute,
                config.requests_per_hour,
            ),
            next_id: AtomicU64::new(1),
            config,
            launcher,
            recorder,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &DocumentResolver {
        &self.documents
    }

    /// 按原始输入检索；输入不合法时不会启动浏览器，也不会写结果记录
    pub async fn search(&self, case_type: &str, case_number: &str, filing_year: &str) -> SearchResult {
        match SearchCriteria::from_parts(case_type, case_number, filing_year) {
            Ok(criteria) => self.perform_search(criteria).await,
            Err(e) => {
                warn!("检索参数无效: {}", e);
                SearchResult::failure(&e)
            }
        }
    }

    /// 检索一个案件，自动分配请求 id
    pub async fn perform_search(&self, criteria: SearchCriteria) -> SearchResult {
        let request_id = self.next_request_id();
        self.perform_search_with_id(&request_id, criteria).await
    }

    /// 检索一个案件
    ///
    /// 调用方重试同一个逻辑请求时应传入相同的 `request_id`，结果记录只会写一次。
    pub async fn perform_search_with_id(&self, request_id: &str, criteria: SearchCriteria) -> SearchResult {
        let ctx = SearchCtx::new(request_id, criteria);
        let outcome = self.lookup(&ctx).await;

        match &outcome {
            Ok(record) => info!(
                "{} ✅ 检索完成: {} | 文档 {} 个",
                ctx,
                record.parties().as_str(),
                record.document_links().len()
            ),
            Err(e) => {
                error!("{} ❌ 检索失败: {}", ctx, e);
                if let Some(snapshot) = e.diagnostic_snapshot() {
                    debug!("{} 页面快照: {}", ctx, truncate_text(snapshot, 2000));
                }
            }
        }

        self.record(&ctx, &outcome).await;
        SearchResult::from(outcome)
    }

    /// 下载结果中的某个文档，与检索流程相互独立
    pub async fn fetch_document(&self, url: &Url) -> Result<DownloadedDocument> {
        Ok(self.documents.download(url).await?)
    }

    async fn lookup(&self, ctx: &SearchCtx) -> Result<CaseRecord> {
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| LookupError::Browser("会话池已关闭".to_string()))?;
        self.limiter.acquire().await;

        let timeout = self.config.request_timeout();
        let deadline = Instant::now() + timeout;
        info!("{} 🚀 开始检索 (时限 {:?})", ctx, timeout);

        let driver = match timeout_at(deadline, self.launcher.launch()).await {
            Ok(driver) => driver?,
            Err(_) => return Err(LookupError::DeadlineExceeded(timeout)),
        };

        let mut session = Session::new(driver);
        let result = timeout_at(deadline, self.flow.run(&mut session, ctx)).await;
        if tokio::time::timeout(CLOSE_GRACE, session.close()).await.is_err() {
            warn!("{} 关闭浏览器超过 {:?}，不再等待", ctx, CLOSE_GRACE);
        }

        match result {
            Ok(result) => result,
            Err(_) => {
                warn!("{} ⏰ 超过整体时限，已取消", ctx);
                Err(LookupError::DeadlineExceeded(timeout))
            }
        }
    }

    async fn record(&self, ctx: &SearchCtx, outcome: &Result<CaseRecord>) {
        let (status, message, record) = match outcome {
            Ok(record) => (OutcomeStatus::Success, None, Some(record)),
            Err(e) => (OutcomeStatus::Failed, Some(e.to_string()), None),
        };
        if let Err(e) = self
            .recorder
            .record_outcome(&ctx.request_id, &ctx.criteria, status, message.as_deref(), record)
            .await
        {
            warn!("{} 写入结果记录失败: {}", ctx, e);
        }
    }

    fn next_request_id(&self) -> String {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), seq)
    }
}
