/// 页面上显示的验证码读数
///
/// 只在一次提交尝试内有效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationChallenge {
    raw_text: String,
    code: Option<VerifiedCode>,
}

/// 已确认是 4 位数字的验证码
///
/// 只能由 `VerificationChallenge` 产生，保证格式错误的读数无法写入表单。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCode(String);

impl VerifiedCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl VerificationChallenge {
    /// 从页面文本构造；去除首尾空白后恰好 4 位 ASCII 数字才有效
    pub fn from_text(raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let trimmed = raw_text.trim();
        let code = (trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()))
            .then(|| VerifiedCode(trimmed.to_string()));
        Self { raw_text, code }
    }

    /// 页面上找不到验证码元素
    pub fn missing() -> Self {
        Self {
            raw_text: String::new(),
            code: None,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_valid(&self) -> bool {
        self.code.is_some()
    }

    /// 读数为空（元素缺失或文本为空白）
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
    }

    pub fn verified(&self) -> Option<&VerifiedCode> {
        self.code.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_digits_are_valid() {
        let challenge = VerificationChallenge::from_text(" 4821\n");
        assert!(challenge.is_valid());
        assert_eq!(challenge.verified().unwrap().as_str(), "4821");
    }

    #[test]
    fn malformed_readings_are_invalid() {
        for raw in ["12a4", "123", "12345", "١٢٣٤", "12 4"] {
            let challenge = VerificationChallenge::from_text(raw);
            assert!(!challenge.is_valid(), "{raw} should be invalid");
            assert!(!challenge.is_empty());
        }
    }

    #[test]
    fn blank_reading_is_empty() {
        assert!(VerificationChallenge::from_text("   ").is_empty());
        assert!(VerificationChallenge::missing().is_empty());
        assert!(!VerificationChallenge::missing().is_valid());
    }
}
