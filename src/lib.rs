//! # Court Case Lookup
//!
//! 驱动浏览器在德里高等法院案号检索页面上查询案件，并提取结构化结果
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - `BrowserDriver` 能力抽象、chromiumoxide 实现、独占的 `Session`
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner
//!
//! ### ② 业务能力层（Services）
//! - `VerificationResolver` - 读取并照抄页面验证码
//! - `SubmissionController` - 一次有界的表单提交
//! - `ExtractionChain` - 表格 → 区块 → 内嵌数据 → 文本，依次尝试
//! - `DocumentResolver` - 文档链接补全、去重与下载
//! - `OutcomeRecorder` - 结果记录
//!
//! ### ③ 流程层（Workflow）
//! - `SearchCtx` - 请求上下文
//! - `SearchFlow` - 重试与退避
//!
//! ### ④ 编排层（Orchestration）
//! - `CaseLookup` - 并发与频率控制、整体时限、会话关闭
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserDriver, BrowserLauncher, ChromiumLauncher, Session};
pub use config::Config;
pub use error::{DownloadError, LookupError, ParseFailure, Result};
pub use models::{CaseRecord, CaseType, DocumentLink, FieldValue, SearchCriteria, SearchResult};
pub use orchestrator::CaseLookup;
pub use services::{DocumentResolver, ExtractionChain, JsonlOutcomeRecorder, OutcomeRecorder};
pub use workflow::{SearchCtx, SearchFlow};
