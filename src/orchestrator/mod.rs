//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `case_lookup` - 检索入口
//! - 控制同时存在的会话数量（Semaphore）
//! - 准入限流（每分钟 / 每小时）
//! - 持有整体时限，保证会话在任何情况下都被关闭
//! - 写结果记录
//!
//! ### `rate_limiter` - 滑动窗口限流
//!
//! ## 层次关系
//!
//! ```text
//! case_lookup (处理单个请求)
//!     ↓
//! workflow::SearchFlow (重试与退避)
//!     ↓
//! services (能力层：提交 / 验证码 / 解析 / 文档 / 记录)
//!     ↓
//! browser (基础设施：Session、BrowserDriver)
//! ```

pub mod case_lookup;
pub mod rate_limiter;

pub use case_lookup::CaseLookup;
pub use rate_limiter::{RateLimiter, Window};
