use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::LookupError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 启动浏览器，返回浏览器句柄和后台事件循环
pub async fn launch_browser(config: &Config) -> Result<(Browser, JoinHandle<()>), LookupError> {
    info!("🚀 启动浏览器 (headless: {})...", config.headless);

    let mut builder = BrowserConfig::builder()
        .window_size(1920, 1080)
        .args(vec![
            "--no-sandbox".to_string(),           // 容器中运行时没有沙盒权限
            "--disable-dev-shm-usage".to_string(), // 防止共享内存不足
            "--disable-gpu".to_string(),
            "--disable-background-timer-throttling".to_string(),
            format!("--user-agent={}", USER_AGENT),
        ]);

    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(path) = &config.chrome_executable {
        debug!("使用浏览器: {}", path);
        builder = builder.chrome_executable(Path::new(path));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        LookupError::Browser(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        LookupError::Browser(format!("启动浏览器失败: {}", e))
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let events = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok((browser, events))
}
