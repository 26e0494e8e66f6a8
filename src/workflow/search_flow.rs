//! 检索流程 - 流程层
//!
//! 核心职责：定义"一个案号"的完整检索流程
//!
//! 每次尝试：
//! 1. 重新加载检索页面（验证码随之刷新）
//! 2. `SubmissionController` 完成一次有界的提交
//! 3. 成功或终止性错误立即返回；可重试的原因先随机等待再进入下一次
//!
//! 流程不持有会话，会话的创建和关闭由编排层负责。

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::browser::Session;
use crate::config::{Config, VerificationPolicy};
use crate::error::{LookupError, Result};
use crate::models::{AttemptOutcome, CaseRecord, RetryReason};
use crate::services::SubmissionController;
use crate::workflow::search_ctx::SearchCtx;

pub struct SearchFlow {
    controller: SubmissionController,
    search_url: String,
    navigation_timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    policy: VerificationPolicy,
}

impl SearchFlow {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            controller: SubmissionController::new(config)?,
            search_url: config.search_url.clone(),
            navigation_timeout: config.navigation_timeout(),
            max_retries: config.max_retries,
            base_delay: config.scraping_delay(),
            policy: config.verification.clone(),
        })
    }

    /// 在同一个会话上执行检索，最多尝试 `max_retries` 次
    pub async fn run(&self, session: &mut Session, ctx: &SearchCtx) -> Result<CaseRecord> {
        let mut streak = VerificationStreak::default();
        let mut last_reason = None;

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                let delay = self.retry_delay();
                info!("{} ⏳ {:?} 后进行第 {} 次尝试", ctx, delay, attempt);
                sleep(delay).await;
            }

            let outcome = match session.navigate(&self.search_url, self.navigation_timeout).await {
                Ok(()) => self.controller.submit(session, &ctx.criteria).await,
                Err(LookupError::Navigation(msg)) => {
                    AttemptOutcome::Retryable(RetryReason::Navigation(msg))
                }
                Err(e) => AttemptOutcome::Terminal(e),
            };

            match outcome {
                AttemptOutcome::Success(record) => {
                    info!(
                        "{} ✅ 第 {} 次尝试成功 (解析方式: {})",
                        ctx,
                        attempt,
                        record.strategy()
                    );
                    return Ok(record);
                }
                AttemptOutcome::Terminal(e) => {
                    error!("{} ❌ 第 {} 次尝试失败，不再重试: {}", ctx, attempt, e);
                    return Err(e);
                }
                AttemptOutcome::Retryable(reason) => {
                    warn!(
                        "{} ⚠️ 第 {}/{} 次尝试失败: {}",
                        ctx, attempt, self.max_retries, reason
                    );
                    if let Some(e) = streak.observe(&reason, &self.policy) {
                        error!("{} ❌ {}", ctx, e);
                        return Err(e);
                    }
                    last_reason = Some(reason);
                }
            }
        }

        let last_reason = last_reason.unwrap_or(RetryReason::Timeout);
        error!("{} ❌ {} 次尝试全部失败", ctx, self.max_retries);
        Err(LookupError::ExhaustedRetries {
            attempts: self.max_retries,
            last_reason,
        })
    }

    /// 在 [delay, 2*delay] 之间随机
    fn retry_delay(&self) -> Duration {
        let base = self.base_delay.as_secs_f64();
        if base <= 0.0 {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(base..=base * 2.0);
        Duration::from_secs_f64(secs)
    }
}

/// 连续出现的空验证码 / 格式错误验证码次数
#[derive(Debug, Default)]
struct VerificationStreak {
    empty: u32,
    malformed: u32,
}

impl VerificationStreak {
    /// 达到策略上限时返回终止性错误
    fn observe(&mut self, reason: &RetryReason, policy: &VerificationPolicy) -> Option<LookupError> {
        match reason {
            RetryReason::VerificationEmpty => {
                self.empty += 1;
                self.malformed = 0;
                hit_limit(self.empty, policy.empty_limit).then(|| {
                    LookupError::Verification(format!("连续 {} 次读不到验证码", self.empty))
                })
            }
            RetryReason::VerificationMalformed(raw) => {
                self.malformed += 1;
                self.empty = 0;
                hit_limit(self.malformed, policy.malformed_limit).then(|| {
                    LookupError::Verification(format!(
                        "连续 {} 次验证码格式错误，最后读数 {:?}",
                        self.malformed, raw
                    ))
                })
            }
            _ => {
                self.empty = 0;
                self.malformed = 0;
                None
            }
        }
    }
}

fn hit_limit(count: u32, limit: Option<u32>) -> bool {
    limit.is_some_and(|limit| count >= limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_counts_consecutive_readings_only() {
        let policy = VerificationPolicy {
            empty_limit: Some(2),
            malformed_limit: None,
        };
        let mut streak = VerificationStreak::default();

        assert!(streak.observe(&RetryReason::VerificationEmpty, &policy).is_none());
        assert!(streak.observe(&RetryReason::Timeout, &policy).is_none());
        assert!(streak.observe(&RetryReason::VerificationEmpty, &policy).is_none());
        let err = streak.observe(&RetryReason::VerificationEmpty, &policy);
        assert!(matches!(err, Some(LookupError::Verification(_))));
    }

    #[test]
    fn no_limit_means_always_retryable() {
        let policy = VerificationPolicy::default();
        let mut streak = VerificationStreak::default();
        for _ in 0..50 {
            let reason = RetryReason::VerificationMalformed("12a4".to_string());
            assert!(streak.observe(&reason, &policy).is_none());
        }
    }

    #[test]
    fn delay_stays_within_bounds() {
        let config = Config {
            scraping_delay_secs: 0.5,
            ..Default::default()
        };
        let flow = SearchFlow::new(&config).unwrap();
        for _ in 0..100 {
            let delay = flow.retry_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1000));
        }

        let config = Config {
            scraping_delay_secs: 0.0,
            ..Default::default()
        };
        assert_eq!(SearchFlow::new(&config).unwrap().retry_delay(), Duration::ZERO);
    }
}
