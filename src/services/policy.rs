//! 短链接跳转前的策略判定
//!
//! 判定顺序固定：存在/启用 → 过期 → 点击上限 → 密码，命中即返回。

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::storage::TrackedLink;
use crate::utils::password::verify_password;

/// 密码挑战使用的 realm
pub const PASSWORD_REALM: &str = "Link Password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// 允许跳转，携带最终目标地址
    Redirect(String),
    NotFound,
    Expired,
    ClickCapReached,
    PasswordRequired,
    PasswordInvalid,
}

impl PolicyOutcome {
    pub fn is_redirect(&self) -> bool {
        matches!(self, PolicyOutcome::Redirect(_))
    }
}

/// 从 `Authorization: Basic base64(user:secret)` 中取出 secret
///
/// 外层 None 表示没有 Basic 凭据；内层 None 表示凭据无法解码
fn basic_secret(authorization: Option<&str>) -> Option<Option<String>> {
    let encoded = authorization?.strip_prefix("Basic ")?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());

    Some(decoded.map(|pair| match pair.split_once(':') {
        Some((_, secret)) => secret.to_string(),
        None => pair,
    }))
}

/// 对（已按 `is_active` 过滤的）链接执行策略判定
///
/// 只有存储的密码哈希本身无法解析时才返回错误
pub fn evaluate(
    link: Option<&TrackedLink>,
    authorization: Option<&str>,
    now: DateTime<Utc>,
) -> Result<PolicyOutcome> {
    let Some(link) = link.filter(|l| l.is_active) else {
        return Ok(PolicyOutcome::NotFound);
    };

    if link.is_expired_at(now) {
        return Ok(PolicyOutcome::Expired);
    }

    if link.click_cap_reached() {
        return Ok(PolicyOutcome::ClickCapReached);
    }

    if let Some(hash) = link.password_hash.as_deref() {
        let secret = match basic_secret(authorization) {
            None => return Ok(PolicyOutcome::PasswordRequired),
            Some(None) => return Ok(PolicyOutcome::PasswordInvalid),
            Some(Some(secret)) => secret,
        };
        if !verify_password(&secret, hash)? {
            return Ok(PolicyOutcome::PasswordInvalid);
        }
    }

    Ok(PolicyOutcome::Redirect(link.original_url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UtmParams;
    use crate::utils::password::hash_password;
    use chrono::Duration;

    fn link() -> TrackedLink {
        let now = Utc::now();
        TrackedLink {
            id: "abc123".to_string(),
            original_url: "https://example.com/page?utm_source=foo".to_string(),
            owner_id: "user-1".to_string(),
            is_active: true,
            expires_at: None,
            max_clicks: None,
            password_hash: None,
            utm: UtmParams::default(),
            campaign_name: None,
            total_clicks: 0,
            unique_clicks: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn basic(user: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, secret)))
    }

    #[test]
    fn test_plain_link_redirects_verbatim() {
        let outcome = evaluate(Some(&link()), None, Utc::now()).unwrap();
        assert_eq!(
            outcome,
            PolicyOutcome::Redirect("https://example.com/page?utm_source=foo".to_string())
        );
    }

    #[test]
    fn test_missing_or_inactive_is_not_found() {
        assert_eq!(evaluate(None, None, Utc::now()).unwrap(), PolicyOutcome::NotFound);

        let mut inactive = link();
        inactive.is_active = false;
        assert_eq!(
            evaluate(Some(&inactive), None, Utc::now()).unwrap(),
            PolicyOutcome::NotFound
        );
    }

    #[test]
    fn test_expired_wins_over_password() {
        let now = Utc::now();
        let mut l = link();
        l.expires_at = Some(now - Duration::hours(1));
        l.password_hash = Some(hash_password("secret").unwrap());
        l.max_clicks = Some(1);
        l.total_clicks = 5;

        assert_eq!(evaluate(Some(&l), None, now).unwrap(), PolicyOutcome::Expired);
    }

    #[test]
    fn test_future_expiry_still_redirects() {
        let now = Utc::now();
        let mut l = link();
        l.expires_at = Some(now + Duration::days(1));
        assert!(evaluate(Some(&l), None, now).unwrap().is_redirect());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let mut l = link();

        // 到期时刻本身仍可访问，之后才过期
        l.expires_at = Some(now);
        assert!(evaluate(Some(&l), None, now).unwrap().is_redirect());
        assert_eq!(
            evaluate(Some(&l), None, now + Duration::milliseconds(1)).unwrap(),
            PolicyOutcome::Expired
        );
    }

    #[test]
    fn test_click_cap() {
        let mut l = link();
        l.max_clicks = Some(3);
        l.total_clicks = 2;
        assert!(evaluate(Some(&l), None, Utc::now()).unwrap().is_redirect());

        l.total_clicks = 3;
        assert_eq!(
            evaluate(Some(&l), None, Utc::now()).unwrap(),
            PolicyOutcome::ClickCapReached
        );
    }

    #[test]
    fn test_password_challenge() {
        let mut l = link();
        l.password_hash = Some(hash_password("open-sesame").unwrap());
        let now = Utc::now();

        assert_eq!(evaluate(Some(&l), None, now).unwrap(), PolicyOutcome::PasswordRequired);
        assert_eq!(
            evaluate(Some(&l), Some("Bearer abc"), now).unwrap(),
            PolicyOutcome::PasswordRequired
        );
        assert_eq!(
            evaluate(Some(&l), Some(&basic("anyone", "wrong")), now).unwrap(),
            PolicyOutcome::PasswordInvalid
        );
        assert_eq!(
            evaluate(Some(&l), Some("Basic %%%not-base64"), now).unwrap(),
            PolicyOutcome::PasswordInvalid
        );
        assert!(
            evaluate(Some(&l), Some(&basic("ignored", "open-sesame")), now)
                .unwrap()
                .is_redirect()
        );
    }

    #[test]
    fn test_secret_may_contain_colon() {
        assert_eq!(
            basic_secret(Some(&basic("u", "a:b:c"))),
            Some(Some("a:b:c".to_string()))
        );
        assert_eq!(basic_secret(Some("Digest xyz")), None);
    }
}
