//! 浏览器会话
//!
//! 独占一个浏览器句柄，生命周期 Created → Navigated → (Submitting)* → Closed。
//! 会话不会在请求之间共享，也不会进入任何池。

use std::time::Duration;

use tracing::{debug, warn};

use crate::browser::driver::BrowserDriver;
use crate::error::{DriverError, LookupError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Navigated,
    Submitting,
    Closed,
}

pub struct Session {
    driver: Box<dyn BrowserDriver>,
    state: SessionState,
}

impl Session {
    pub fn new(driver: Box<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            state: SessionState::Created,
        }
    }

    /// 创建会话并打开检索页面；导航失败时先关闭句柄再返回 `Navigation`
    pub async fn open(
        driver: Box<dyn BrowserDriver>,
        url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut session = Self::new(driver);
        if let Err(e) = session.navigate(url, timeout).await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// （重新）加载页面，页面上的验证码会随之刷新
    pub async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        match self.driver.navigate(url, timeout).await {
            Ok(()) => {
                self.state = SessionState::Navigated;
                Ok(())
            }
            Err(DriverError::Timeout(t)) => Err(LookupError::Navigation(format!(
                "{} 在 {:?} 内未加载完成",
                url, t
            ))),
            Err(e) => Err(LookupError::Navigation(format!("{}: {}", url, e))),
        }
    }

    /// 进入提交阶段，要求页面已加载
    pub fn begin_submit(&mut self) -> Result<()> {
        match self.state {
            SessionState::Navigated | SessionState::Submitting => {
                self.state = SessionState::Submitting;
                Ok(())
            }
            SessionState::Created => Err(LookupError::Navigation(
                "检索页面尚未加载".to_string(),
            )),
            SessionState::Closed => Err(LookupError::Browser("会话已关闭".to_string())),
        }
    }

    /// 访问底层浏览器能力
    pub fn driver(&mut self) -> Result<&mut dyn BrowserDriver> {
        self.ensure_open()?;
        Ok(self.driver.as_mut())
    }

    /// 关闭会话，可重复调用
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        match self.driver.close().await {
            Ok(()) => debug!("浏览器会话已关闭"),
            Err(e) => warn!("关闭浏览器会话时出错: {}", e),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(LookupError::Browser("会话已关闭".to_string()));
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // 外层 future 被取消时会走到这里；浏览器句柄随 driver 一起释放
        if self.state != SessionState::Closed {
            warn!("浏览器会话未经 close() 即被释放");
        }
    }
}
