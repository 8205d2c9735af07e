//! 目标 URL 校验与 UTM 参数合并

use url::Url;

use crate::storage::UtmParams;

/// 目标 URL 最大长度
pub const MAX_URL_LENGTH: usize = 2048;

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    TooLong,
    InvalidProtocol(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::TooLong => write!(f, "URL must be less than {} characters", MAX_URL_LENGTH),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 面向 API 调用方的错误文案
pub fn validation_error_message(error: &UrlValidationError) -> &'static str {
    match error {
        UrlValidationError::EmptyUrl | UrlValidationError::InvalidFormat(_) => {
            "Please provide a valid URL"
        }
        UrlValidationError::TooLong => "URL must be less than 2048 characters",
        UrlValidationError::InvalidProtocol(_) => "Only HTTP and HTTPS URLs are allowed",
    }
}

fn parse_http_url(raw: &str) -> Result<Url, UrlValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let url = Url::parse(raw).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::InvalidProtocol(format!("{}:", other))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::InvalidFormat("missing host".to_string()));
    }

    Ok(url)
}

/// 校验并规范化目标 URL（只允许 http/https）
pub fn sanitize_url(raw: &str) -> Result<String, UrlValidationError> {
    parse_http_url(raw).map(|url| url.to_string())
}

/// 把 UTM 参数合并进 URL 的查询串
///
/// URL 中已存在的同名参数保持不变；不会引入空的 `?`。
pub fn merge_utm_params(raw: &str, utm: &UtmParams) -> Result<String, UrlValidationError> {
    let mut url = parse_http_url(raw)?;

    let missing: Vec<(&str, &str)> = utm
        .pairs()
        .into_iter()
        .filter(|(key, _)| !url.query_pairs().any(|(existing, _)| existing == *key))
        .collect();

    if !missing.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in missing {
            query.append_pair(key, value);
        }
    }

    Ok(url.to_string())
}
