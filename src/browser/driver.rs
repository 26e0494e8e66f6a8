//! 浏览器能力接口
//!
//! 引擎只依赖这里的 trait，真实浏览器和测试用的假实现都从这里接入。

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DriverError, LookupError};

/// 下拉框选择结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// 已选中，携带实际选中的 option value
    Selected(String),
    /// 找不到下拉框
    NoSuchElement,
    /// 下拉框中没有匹配的选项
    NoSuchOption,
}

/// 一个浏览器自动化句柄的全部能力
///
/// 实现不要求并发安全：所有方法都需要 `&mut self`，同一时刻只有一个调用者。
#[async_trait]
pub trait BrowserDriver: Send {
    /// 导航到指定地址，超过时限返回 `DriverError::Timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// 读取元素的可见文本，元素不存在时返回 `None`
    async fn find_text(&mut self, selector: &str) -> Result<Option<String>, DriverError>;

    /// 写入输入框，元素不存在时返回 `false`
    async fn fill_field(&mut self, selector: &str, value: &str) -> Result<bool, DriverError>;

    async fn select_option(
        &mut self,
        selector: &str,
        value: &str,
    ) -> Result<SelectOutcome, DriverError>;

    /// 点击元素，元素不存在时返回 `false`
    async fn click(&mut self, selector: &str) -> Result<bool, DriverError>;

    /// 当前页面的 HTML
    async fn html(&mut self) -> Result<String, DriverError>;

    /// 释放浏览器资源
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// 为每个请求创建新的浏览器句柄
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, LookupError>;
}
