//! 身份令牌校验
//!
//! 后端只信任身份提供方签发的 HS256 Bearer token，`sub` 即用户 ID。

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::errors::{LinkTrackerError, Result};
use crate::utils::generate_random_code;

/// 令牌被拒绝时对外的统一文案
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser>;
}

/// 身份提供方签发的令牌通常不带 `jti`，只有 `sub` 和 `exp` 是必需的
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default)]
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    // aud 可能是字符串或数组，iss 同样交给 Validation 校验，解码时忽略
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    aud: Option<String>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

pub struct JwtIdentityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    audience: Option<String>,
    issuer: Option<String>,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, audience: Option<String>, issuer: Option<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience.as_deref() {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = issuer.as_deref() {
            validation.set_issuer(&[iss]);
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            audience,
            issuer,
        }
    }

    /// 未配置密钥时生成随机密钥（此时外部签发的令牌全部无效）
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = if config.jwt_secret.is_empty() {
            warn!("auth.jwt_secret not configured, generating a random secret");
            generate_random_code(48)
        } else {
            config.jwt_secret.clone()
        };

        Self::new(&secret, config.audience.clone(), config.issuer.clone())
    }

    /// 用同一密钥签发令牌（本地调试 / CLI）
    pub fn issue_token(&self, user_id: &str, email: Option<&str>, minutes: i64) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(String::from),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(minutes)).timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| LinkTrackerError::identity_provider(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            LinkTrackerError::forbidden(INVALID_TOKEN_MESSAGE)
        })?;

        if data.claims.sub.is_empty() {
            return Err(LinkTrackerError::forbidden(INVALID_TOKEN_MESSAGE));
        }

        Ok(AuthenticatedUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_32_bytes_long!!";

    #[tokio::test]
    async fn test_issue_and_verify() {
        let verifier = JwtIdentityVerifier::new(SECRET, None, None);
        let token = verifier
            .issue_token("user-42", Some("ada@example.com"), 15)
            .unwrap();

        let user = verifier.verify(&token).await.unwrap();
        assert_eq!(user.id, "user-42");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_rejects_foreign_signature_and_expiry() {
        let verifier = JwtIdentityVerifier::new(SECRET, None, None);
        let other = JwtIdentityVerifier::new("another_secret_key_32_bytes!!!!", None, None);

        let foreign = other.issue_token("user-42", None, 15).unwrap();
        let err = verifier.verify(&foreign).await.unwrap_err();
        assert_eq!(err.message(), INVALID_TOKEN_MESSAGE);
        assert_eq!(err.http_status().as_u16(), 403);

        // 超出默认 60 秒 leeway
        let expired = verifier.issue_token("user-42", None, -5).unwrap();
        assert!(verifier.verify(&expired).await.is_err());

        assert!(verifier.verify("not.a.jwt").await.is_err());
    }

    #[tokio::test]
    async fn test_audience_and_issuer() {
        let verifier = JwtIdentityVerifier::new(
            SECRET,
            Some("authenticated".to_string()),
            Some("https://auth.example.com".to_string()),
        );
        let token = verifier.issue_token("user-1", None, 5).unwrap();
        assert!(verifier.verify(&token).await.is_ok());

        let plain = JwtIdentityVerifier::new(SECRET, None, None);
        let no_aud = plain.issue_token("user-1", None, 5).unwrap();
        assert!(verifier.verify(&no_aud).await.is_err());
    }

    fn sign(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_accepts_provider_token_without_jti() {
        let now = Utc::now().timestamp();
        let token = sign(serde_json::json!({
            "sub": "user-7",
            "aud": "authenticated",
            "exp": now + 600,
            "iat": now,
            "email": "grace@example.com",
            "role": "authenticated",
        }));

        let plain = JwtIdentityVerifier::new(SECRET, None, None);
        let user = plain.verify(&token).await.unwrap();
        assert_eq!(user.id, "user-7");
        assert_eq!(user.email.as_deref(), Some("grace@example.com"));

        let with_aud = JwtIdentityVerifier::new(SECRET, Some("authenticated".to_string()), None);
        assert!(with_aud.verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_accepts_audience_array() {
        let now = Utc::now().timestamp();
        let token = sign(serde_json::json!({
            "sub": "user-8",
            "aud": ["authenticated", "dashboard"],
            "exp": now + 600,
        }));

        let verifier = JwtIdentityVerifier::new(SECRET, Some("dashboard".to_string()), None);
        assert_eq!(verifier.verify(&token).await.unwrap().id, "user-8");

        let other = JwtIdentityVerifier::new(SECRET, Some("billing".to_string()), None);
        assert!(other.verify(&token).await.is_err());

        let plain = JwtIdentityVerifier::new(SECRET, None, None);
        assert!(plain.verify(&token).await.is_ok());
    }
}
