use std::fmt;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, Result};

/// 站点案件类型代码表（规范化标签 → 下拉框 option value）
///
/// 键统一为大写、去除首尾空白。别名与站点代码指向同一个值。
static CASE_TYPE_CODES: phf::Map<&'static str, &'static str> = phf_map! {
    "W.P.(C)" => "W.P.(C)",
    "W.P.(CRL)" => "W.P.(CRL)",
    "CRL.A." => "CRL.A.",
    "CRL.M.C." => "CRL.M.C.",
    "CRL.REV.P." => "CRL.REV.P.",
    "BAIL APPLN." => "BAIL APPLN.",
    "CS(OS)" => "CS(OS)",
    "CS(COMM)" => "CS(COMM)",
    "FAO" => "FAO",
    "FAO(OS)" => "FAO(OS)",
    "RFA" => "RFA",
    "RSA" => "RSA",
    "LPA" => "LPA",
    "CM(M)" => "CM(M)",
    "C.R.P." => "C.R.P.",
    "CONT.CAS(C)" => "CONT.CAS(C)",
    "ARB.P." => "ARB.P.",
    "O.M.P." => "O.M.P.",
    "MAT.APP." => "MAT.APP.",
    "EX.P." => "EX.P.",
    // 常用简称
    "WP" => "W.P.(C)",
    "CRL" => "W.P.(CRL)",
    "CRL.A" => "CRL.A.",
    "CRL.M.C" => "CRL.M.C.",
    "CRL.REV" => "CRL.REV.P.",
    "BAIL" => "BAIL APPLN.",
    "CS" => "CS(OS)",
    "CM" => "CM(M)",
};

/// 站点代码的展示顺序
const SUPPORTED_CODES: &[&str] = &[
    "W.P.(C)",
    "W.P.(CRL)",
    "CRL.A.",
    "CRL.M.C.",
    "CRL.REV.P.",
    "BAIL APPLN.",
    "CS(OS)",
    "CS(COMM)",
    "FAO",
    "FAO(OS)",
    "RFA",
    "RSA",
    "LPA",
    "CM(M)",
    "C.R.P.",
    "CONT.CAS(C)",
    "ARB.P.",
    "O.M.P.",
    "MAT.APP.",
    "EX.P.",
];

fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// 将用户输入的案件类型映射为站点代码
///
/// 纯函数：同样的输入总是得到同样的结果，未收录的类型返回 `Validation`。
pub fn site_code_for(label: &str) -> Result<&'static str> {
    let key = normalize_label(label);
    CASE_TYPE_CODES
        .get(key.as_str())
        .copied()
        .ok_or_else(|| LookupError::Validation(format!("不支持的案件类型: {}", label.trim())))
}

/// 已校验的案件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaseType {
    code: &'static str,
}

impl CaseType {
    /// 从用户输入解析（支持简称）
    pub fn parse(label: &str) -> Result<Self> {
        site_code_for(label).map(|code| Self { code })
    }

    /// 站点下拉框使用的代码
    pub fn site_code(self) -> &'static str {
        self.code
    }

    /// 所有支持的站点代码
    pub fn supported() -> Vec<CaseType> {
        SUPPORTED_CODES
            .iter()
            .map(|code| CaseType { code })
            .collect()
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl Serialize for CaseType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for CaseType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        CaseType::parse(&label).map_err(serde::de::Error::custom)
    }
}

/// 检索条件
///
/// 构造时完成全部校验，构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    case_type: CaseType,
    case_number: String,
    filing_year: u16,
}

impl SearchCriteria {
    pub fn new(case_type: &str, case_number: &str, filing_year: &str) -> Result<Self> {
        let case_type = CaseType::parse(case_type)?;

        let case_number = case_number.trim();
        if case_number.is_empty() {
            return Err(LookupError::Validation("案件编号不能为空".to_string()));
        }
        if case_number.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(LookupError::Validation(format!(
                "案件编号不能包含空白或控制字符: {:?}",
                case_number
            )));
        }

        let year = filing_year.trim();
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(LookupError::Validation(format!(
                "立案年份必须是 4 位数字: {}",
                year
            )));
        }
        let filing_year: u16 = year
            .parse()
            .map_err(|_| LookupError::Validation(format!("立案年份无效: {}", year)))?;
        if filing_year < 1950 {
            return Err(LookupError::Validation(format!(
                "立案年份超出范围: {}",
                filing_year
            )));
        }

        Ok(Self {
            case_type,
            case_number: case_number.to_string(),
            filing_year,
        })
    }

    /// 解析 `类型/编号/年份` 形式的完整案号，例如 `W.P.(C)/11199/2025`
    ///
    /// 类型本身可能包含 `/`，因此从右侧切分。
    pub fn parse_composite(composite: &str) -> Result<Self> {
        let mut parts = composite.trim().rsplitn(3, '/');
        let year = parts.next().unwrap_or_default();
        let number = parts.next();
        let case_type = parts.next();

        match (case_type, number) {
            (Some(case_type), Some(number)) => Self::new(case_type, number, year),
            _ => Err(LookupError::Validation(format!(
                "无法解析完整案号: {}",
                composite.trim()
            ))),
        }
    }

    /// 接收前端表单的三个字段；类型字段中填写完整案号时优先按完整案号解析
    pub fn from_parts(case_type: &str, case_number: &str, filing_year: &str) -> Result<Self> {
        if case_type.matches('/').count() >= 2
            && case_number.trim().is_empty()
            && filing_year.trim().is_empty()
        {
            return Self::parse_composite(case_type);
        }
        Self::new(case_type, case_number, filing_year)
    }

    pub fn case_type(&self) -> CaseType {
        self.case_type
    }

    pub fn case_number(&self) -> &str {
        &self.case_number
    }

    pub fn filing_year(&self) -> u16 {
        self.filing_year
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.case_type, self.case_number, self.filing_year
        )
    }
}
