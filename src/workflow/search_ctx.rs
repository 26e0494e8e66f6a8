//! 检索上下文
//!
//! 封装"我正在处理哪个请求、查的是哪个案号"这一信息

use std::fmt::Display;

use crate::models::SearchCriteria;

/// 单个检索请求的上下文，主要用作日志前缀
#[derive(Debug, Clone)]
pub struct SearchCtx {
    /// 请求 id，同时是结果记录的幂等键
    pub request_id: String,

    pub criteria: SearchCriteria,
}

impl SearchCtx {
    pub fn new(request_id: impl Into<String>, criteria: SearchCriteria) -> Self {
        Self {
            request_id: request_id.into(),
            criteria,
        }
    }
}

impl Display for SearchCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[请求 {} {}]", self.request_id, self.criteria)
    }
}
