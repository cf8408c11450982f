//! 日期工具
//!
//! 门户页面中的日期格式固定为 `日. 月. 年`，例如 `5. 3. 2024`

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ParseError;

fn portal_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]{1,2})\. ([0-9]{1,2})\. ([0-9]{4})$").expect("hardcoded date regex"))
}

/// 将门户日期转换为 `YYYY-MM-DD`
///
/// 只检查格式，不检查日期是否真实存在
pub fn date2sql(date: &str) -> Result<String, ParseError> {
    let caps = portal_date_regex()
        .captures(date)
        .ok_or_else(|| ParseError::InvalidDate(date.to_string()))?;
    Ok(format!("{}-{:0>2}-{:0>2}", &caps[3], &caps[2], &caps[1]))
}

/// 解析门户日期
///
/// 单元格中的空白字符（包括不换行空格）先统一为普通空格
pub fn parse_portal_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let text: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let sql = date2sql(&text)?;
    NaiveDate::parse_from_str(&sql, "%Y-%m-%d").map_err(|_| ParseError::InvalidDate(text))
}

/// 将连续空白压缩为单个空格
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
