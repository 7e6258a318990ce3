//! 日期参数解析
//!
//! 配送日期统一锚定在 UTC 正午：任何时区下换算后仍落在同一日历日，
//! 数据库按日截断比较时不会出现跨日偏移。

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// 日期格式错误的固定提示
pub const DATE_FORMAT_MESSAGE: &str = "Invalid date format (expected YYYY-MM-DD or ISO)";

/// 解析 `YYYY-MM-DD` 或 ISO 字符串的日期部分，返回当天 UTC 12:00
///
/// 非法输入（段数不对、非数字、不存在的日历日）返回 None。
pub fn parse_date_utc_noon(input: &str) -> Option<DateTime<Utc>> {
    let date_part = input.trim().split('T').next()?;

    let mut parts = date_part.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )?;

    date.and_hms_opt(12, 0, 0).map(|naive| naive.and_utc())
}

/// 不带时区的 ISO 时间格式，按 UTC 解释
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// 宽松解析：RFC 3339 时间点、不带时区的 ISO 时间（UTC），或 `YYYY-MM-DD`（UTC 零点）
///
/// 用于订单搜索，与配送接口的正午锚定不同。
pub fn parse_date_lenient(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(instant.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
    {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
