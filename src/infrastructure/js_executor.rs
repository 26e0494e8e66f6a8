//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::DriverError;

/// 把字符串转成 JS 字面量，选择器和取值都经过这里再嵌入脚本
pub fn js_literal(value: &str) -> Result<String, DriverError> {
    serde_json::to_string(value).map_err(|e| DriverError::Protocol(e.to_string()))
}

/// JS 执行器
///
/// 不认识案件、验证码或表单，只知道"在页面上跑一段脚本"。
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 导航和读取页面源码仍需直接访问 page
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, DriverError> {
        let result = self.page.evaluate(js_code.into()).await?;
        result
            .into_value()
            .map_err(|e| DriverError::Protocol(format!("脚本返回值无法解析: {}", e)))
    }

    /// 执行脚本并反序列化
    ///
    /// 脚本应当返回对象而不是裸 `null`，否则无法区分"没有返回值"和协议错误。
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, DriverError> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value)
            .map_err(|e| DriverError::Protocol(format!("脚本返回值类型不符: {}", e)))
    }

    /// 对 `selector` 命中的第一个元素执行 `body`
    ///
    /// `body` 中可以用 `el` 引用该元素；元素不存在时脚本返回 `missing`。
    pub async fn on_element<T: DeserializeOwned>(
        &self,
        selector: &str,
        body: &str,
        missing: &str,
    ) -> Result<T, DriverError> {
        let js_code = format!(
            "((el) => {{ if (!el) return {}; {} }})(document.querySelector({}))",
            missing,
            body,
            js_literal(selector)?
        );
        self.eval_as(js_code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_quotes() {
        assert_eq!(
            js_literal("input[name='captcha']").unwrap(),
            "\"input[name='captcha']\""
        );
        assert_eq!(js_literal("a\"b").unwrap(), "\"a\\\"b\"");
    }
}
