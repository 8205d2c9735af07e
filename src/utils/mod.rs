pub mod csv_handler;
pub mod ip;
pub mod password;
pub mod url_validator;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// 链接 ID 允许的最大长度
pub const MAX_LINK_ID_LENGTH: usize = 20;

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// 链接 ID 格式：1-20 位字母、数字、`_`、`-`
pub fn is_valid_link_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_LINK_ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// 解析 ISO 8601 时间（RFC 3339 或 `YYYY-MM-DD`）
///
/// 只有日期时取当天 00:00:00，`end_of_day` 为 true 时取当天 23:59:59.999（UTC）
pub fn parse_iso8601(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };
    Some(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_code() {
        let code = generate_random_code(10);
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(is_valid_link_id(&code));
    }

    #[test]
    fn test_is_valid_link_id() {
        assert!(is_valid_link_id("abc123"));
        assert!(is_valid_link_id("my_link-2"));
        assert!(!is_valid_link_id(""));
        assert!(!is_valid_link_id("a/b"));
        assert!(!is_valid_link_id("with space"));
        assert!(!is_valid_link_id(&"x".repeat(21)));
    }

    #[test]
    fn test_parse_iso8601() {
        let dt = parse_iso8601("2026-05-01T10:00:00+02:00", false).unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-05-01T08:00:00+00:00");

        let start = parse_iso8601("2026-05-01", false).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-05-01T00:00:00+00:00");
        let end = parse_iso8601("2026-05-01", true).unwrap();
        assert!(end > start);
        assert_eq!(end.format("%H:%M:%S").to_string(), "23:59:59");

        assert!(parse_iso8601("05/01/2026", false).is_none());
        assert!(parse_iso8601("", false).is_none());
    }
}
