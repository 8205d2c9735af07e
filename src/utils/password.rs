//! 链接访问密码：Argon2id 哈希与校验

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::{LinkTrackerError, Result};

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LinkTrackerError::password_hash(e.to_string()))
}

/// 验证密码是否匹配哈希（argon2 内部为常量时间比较）
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| LinkTrackerError::password_hash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 处理新建链接时的密码
///
/// - None 或空字符串 → 不设密码
pub fn process_new_password(password: Option<&str>) -> Result<Option<String>> {
    match password {
        Some(pwd) if !pwd.is_empty() => hash_password(pwd).map(Some),
        _ => Ok(None),
    }
}

/// 处理更新链接时的密码，返回 `LinkUpdate::password_hash` 所需的值
///
/// - None → 不修改
/// - 空字符串 → 移除密码
/// - 其他 → 重新哈希
pub fn process_update_password(new_password: Option<&str>) -> Result<Option<Option<String>>> {
    match new_password {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(pwd) => hash_password(pwd).map(|hash| Some(Some(hash))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").expect("hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cret", &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong", &hash).expect("verify should succeed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn test_process_update_password() {
        assert_eq!(process_update_password(None).unwrap(), None);
        assert_eq!(process_update_password(Some("")).unwrap(), Some(None));
        let updated = process_update_password(Some("abc")).unwrap();
        assert!(matches!(updated, Some(Some(ref h)) if h.starts_with("$argon2")));
        assert_eq!(process_new_password(Some("")).unwrap(), None);
    }
}
