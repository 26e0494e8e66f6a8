/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，`verbose` 为真时为 `debug`。
/// 重复调用不会报错，方便测试中多次初始化。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 案件检索");
    info!("🌐 检索页面: {}", config.search_url);
    info!("📊 最大并发会话: {}", config.max_concurrent_sessions);
    info!(
        "🚦 频率上限: 每分钟 {} 次 / 每小时 {} 次",
        config.requests_per_minute, config.requests_per_hour
    );
    info!(
        "🔁 最多尝试 {} 次，整体时限 {} 秒",
        config.max_retries, config.request_timeout_secs
    );
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_text("案件检索引擎", 2), "案件...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
