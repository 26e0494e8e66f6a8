//! chromiumoxide 实现的浏览器能力
//!
//! 所有 DOM 操作都通过 `JsExecutor` 执行一段 JS 完成，选择器和取值用 serde_json 转义后嵌入。

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Browser;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::driver::{BrowserDriver, BrowserLauncher, SelectOutcome};
use crate::browser::headless::launch_browser;
use crate::config::Config;
use crate::error::{DriverError, LookupError};
use crate::infrastructure::{js_literal, JsExecutor};

/// 一个浏览器进程 + 一个页面
pub struct ChromiumDriver {
    browser: Browser,
    executor: JsExecutor,
    events: JoinHandle<()>,
    closed: bool,
}

#[derive(Deserialize)]
struct TextReply {
    found: bool,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct OkReply {
    ok: bool,
}

#[derive(Deserialize)]
struct SelectReply {
    status: String,
    #[serde(default)]
    value: String,
}

impl ChromiumDriver {
    pub fn new(browser: Browser, executor: JsExecutor, events: JoinHandle<()>) -> Self {
        Self {
            browser,
            executor,
            events,
            closed: false,
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        debug!("导航到: {}", url);
        match tokio::time::timeout(timeout, self.executor.page().goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(DriverError::Timeout(timeout)),
        }
    }

    async fn find_text(&mut self, selector: &str) -> Result<Option<String>, DriverError> {
        let reply: TextReply = self
            .executor
            .on_element(
                selector,
                "return { found: true, text: el.innerText || el.textContent || '' };",
                "{ found: false }",
            )
            .await?;
        Ok(reply.found.then_some(reply.text))
    }

    async fn fill_field(&mut self, selector: &str, value: &str) -> Result<bool, DriverError> {
        let body = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return {{ ok: true }};",
            js_literal(value)?
        );
        let reply: OkReply = self.executor.on_element(selector, &body, "{ ok: false }").await?;
        Ok(reply.ok)
    }

    async fn select_option(
        &mut self,
        selector: &str,
        value: &str,
    ) -> Result<SelectOutcome, DriverError> {
        // 先精确匹配 value，再按文本/去括号文本包含关系匹配
        let js_code = format!(
            r#"
            (() => {{
                const sel = document.querySelector({});
                if (!sel) return {{ status: 'no_element' }};
                const wanted = {};
                const bare = wanted.replace(/[()]/g, '');
                const options = Array.from(sel.options || []);
                let opt = options.find(o => o.value === wanted);
                if (!opt) {{
                    opt = options.find(o => {{
                        const text = (o.text || '').trim();
                        return o.value && (text.includes(wanted) || o.value.includes(wanted) || text.includes(bare));
                    }});
                }}
                if (!opt) return {{ status: 'no_option' }};
                sel.value = opt.value;
                sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return {{ status: 'selected', value: opt.value }};
            }})()
            "#,
            js_literal(selector)?,
            js_literal(value)?
        );
        let reply: SelectReply = self.executor.eval_as(js_code).await?;
        Ok(match reply.status.as_str() {
            "selected" => SelectOutcome::Selected(reply.value),
            "no_option" => SelectOutcome::NoSuchOption,
            _ => SelectOutcome::NoSuchElement,
        })
    }

    async fn click(&mut self, selector: &str) -> Result<bool, DriverError> {
        let reply: OkReply = self
            .executor
            .on_element(
                selector,
                "if (el.disabled) return { ok: false }; el.click(); return { ok: true };",
                "{ ok: false }",
            )
            .await?;
        Ok(reply.ok)
    }

    async fn html(&mut self) -> Result<String, DriverError> {
        Ok(self.executor.page().content().await?)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.events.abort();
        result.map(|_| ()).map_err(DriverError::from)
    }
}

/// 为每个请求启动独立的浏览器进程
pub struct ChromiumLauncher {
    config: Config,
}

impl ChromiumLauncher {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, LookupError> {
        let (browser, events) = launch_browser(&self.config).await?;

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                events.abort();
                return Err(LookupError::Browser(format!("创建页面失败: {}", e)));
            }
        };

        Ok(Box::new(ChromiumDriver::new(
            browser,
            JsExecutor::new(page),
            events,
        )))
    }
}
