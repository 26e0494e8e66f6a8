//! 验证码服务 - 业务能力层
//!
//! 站点把验证码以纯文本显示在页面上，这里只负责"读"和"照抄"，从不猜测。

use tracing::{debug, info, warn};

use crate::browser::Session;
use crate::config::SiteSelectors;
use crate::error::{LookupError, Result};
use crate::models::{VerificationChallenge, VerifiedCode};

pub struct VerificationResolver {
    text_selector: String,
    input_selectors: Vec<String>,
}

impl VerificationResolver {
    pub fn new(selectors: &SiteSelectors) -> Self {
        Self {
            text_selector: selectors.captcha_text.clone(),
            input_selectors: selectors.captcha_inputs.clone(),
        }
    }

    /// 读取页面上的验证码
    ///
    /// 元素缺失或格式不对时返回无效的读数而不是报错，由调用方决定是否刷新页面重试。
    pub async fn resolve(&self, session: &mut Session) -> Result<VerificationChallenge> {
        let text = session
            .driver()?
            .find_text(&self.text_selector)
            .await
            .map_err(|e| LookupError::Verification(format!("读取验证码失败: {}", e)))?;

        let challenge = match text {
            Some(text) => VerificationChallenge::from_text(text),
            None => {
                warn!("找不到验证码元素 {}", self.text_selector);
                VerificationChallenge::missing()
            }
        };

        if challenge.is_valid() {
            debug!("验证码读数: {}", challenge.raw_text().trim());
        } else {
            warn!("验证码读数无效: {:?}", challenge.raw_text());
        }
        Ok(challenge)
    }

    /// 把验证码写入表单，按顺序尝试各个输入框选择器
    pub async fn apply(&self, session: &mut Session, code: &VerifiedCode) -> Result<()> {
        let driver = session.driver()?;
        for selector in &self.input_selectors {
            let filled = driver
                .fill_field(selector, code.as_str())
                .await
                .map_err(|e| LookupError::Verification(format!("填写验证码失败: {}", e)))?;
            if filled {
                info!("✓ 验证码已填写");
                return Ok(());
            }
        }
        Err(LookupError::Verification("找不到验证码输入框".to_string()))
    }
}
