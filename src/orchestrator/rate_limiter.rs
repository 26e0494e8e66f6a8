//! 滑动窗口准入限流
//!
//! 同时约束每分钟和每小时的检索数；超过上限时排队等待而不是拒绝。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

/// 一个窗口：`span` 内最多 `limit` 次，`limit == 0` 表示不限
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub limit: u32,
    pub span: Duration,
}

pub struct RateLimiter {
    windows: Vec<Window>,
    /// 已放行请求的时间，按先后排列
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(windows: Vec<Window>) -> Self {
        Self {
            windows,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    pub fn per_minute_and_hour(per_minute: u32, per_hour: u32) -> Self {
        Self::new(vec![
            Window {
                limit: per_minute,
                span: Duration::from_secs(60),
            },
            Window {
                limit: per_hour,
                span: Duration::from_secs(3600),
            },
        ])
    }

    /// 等待直到所有窗口都有空位，然后占用一个
    pub async fn acquire(&self) {
        loop {
            let wait = match self.try_admit() {
                None => return,
                Some(wait) => wait,
            };
            debug!("检索频率已达上限，等待 {:?}", wait);
            sleep(wait).await;
        }
    }

    /// 放行时返回 `None`，否则返回需要等待的时长
    fn try_admit(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut admitted = match self.admitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let longest = self
            .windows
            .iter()
            .filter(|w| w.limit > 0)
            .map(|w| w.span)
            .max()?;
        while admitted
            .front()
            .is_some_and(|t| now.duration_since(*t) >= longest)
        {
            admitted.pop_front();
        }

        let wait = self
            .windows
            .iter()
            .filter(|w| w.limit > 0)
            .filter_map(|w| {
                let in_window: Vec<&Instant> = admitted
                    .iter()
                    .filter(|t| now.duration_since(**t) < w.span)
                    .collect();
                (in_window.len() >= w.limit as usize).then(|| {
                    // 窗口内最早的那次过期后才腾出空位
                    let oldest = in_window[in_window.len() - w.limit as usize];
                    (*oldest + w.span).saturating_duration_since(now)
                })
            })
            .max();

        match wait {
            Some(wait) => Some(wait.max(Duration::from_millis(1))),
            None => {
                admitted.push_back(now);
                None
            }
        }
    }
}
