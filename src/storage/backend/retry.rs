//! 只读查询的重试
//!
//! 连接池耗尽、死锁、SQLite BUSY 这类错误会在稍后自行消失，查询可以原样重发。
//! 写操作不经过这里：提交成功但响应丢失时重发会重复写入。

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// MySQL 1213/1205，PostgreSQL 40001/40P01，SQLite 5 (BUSY) / 6 (LOCKED)
const TRANSIENT_SQL_CODES: &[&str] = &["1213", "1205", "40001", "40P01", "5", "6"];

const TRANSIENT_MESSAGES: &[&str] = &[
    "deadlock",
    "lock wait timeout",
    "database is locked",
    "serialization failure",
];

fn mentions_transient_condition(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    TRANSIENT_MESSAGES.iter().any(|needle| msg.contains(needle))
}

fn runtime_err_is_transient(err: &RuntimeErr) -> bool {
    match err {
        RuntimeErr::SqlxError(sqlx_err) => match sqlx_err
            .as_database_error()
            .and_then(|db_err| db_err.code())
        {
            Some(code) => TRANSIENT_SQL_CODES.iter().any(|known| *known == code),
            None => mentions_transient_condition(&sqlx_err.to_string()),
        },
        RuntimeErr::Internal(msg) => mentions_transient_condition(msg),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// 重发后可能成功的错误
pub fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(e) | DbErr::Query(e) => runtime_err_is_transient(e),
        _ => false,
    }
}

/// 读查询的重试策略
#[derive(Debug, Clone, Copy)]
pub struct ReadRetry {
    /// 首次执行之外最多重发的次数
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReadRetry {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
        }
    }
}

impl From<&DatabaseConfig> for ReadRetry {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            attempts: config.retry_count,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl ReadRetry {
    /// 第 n 次重发前的等待：base * 2^(n-1)，封顶 max，再加至多 25% 抖动
    fn delay_before(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = rand::random_range(0..=capped.as_millis() as u64 / 4);
        capped.saturating_add(Duration::from_millis(jitter_ms))
    }

    /// 执行查询；遇到瞬时错误时按退避间隔重发
    pub async fn run<T, F, Fut>(&self, query: &str, mut issue: F) -> Result<T, DbErr>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        let mut retries = 0;
        loop {
            let err = match issue().await {
                Ok(rows) => {
                    if retries > 0 {
                        debug!("{} succeeded after {} retries", query, retries);
                    }
                    return Ok(rows);
                }
                Err(err) => err,
            };

            if retries >= self.attempts || !is_transient(&err) {
                return Err(err);
            }

            retries += 1;
            let delay = self.delay_before(retries);
            warn!(
                "{} failed ({}/{}): {}; retrying in {:?}",
                query, retries, self.attempts, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::error::ConnAcquireErr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> ReadRetry {
        ReadRetry {
            attempts,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)));
        assert!(is_transient(&DbErr::Query(RuntimeErr::Internal(
            "database is locked".to_string()
        ))));
        assert!(is_transient(&DbErr::Exec(RuntimeErr::Internal(
            "Deadlock found when trying to get lock".to_string()
        ))));
        assert!(!is_transient(&DbErr::RecordNotFound("gone".to_string())));
        assert!(!is_transient(&DbErr::Query(RuntimeErr::Internal(
            "no such column: foo".to_string()
        ))));
    }

    #[test]
    fn test_delay_grows_and_is_capped() {
        let policy = ReadRetry::default();

        let first = policy.delay_before(1);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));

        let third = policy.delay_before(3);
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(500));

        let late = policy.delay_before(12);
        assert!(late >= Duration::from_millis(2000) && late <= Duration::from_millis(2500));
    }

    #[test]
    fn test_policy_from_database_config() {
        let policy = ReadRetry::from(&DatabaseConfig {
            retry_count: 0,
            retry_base_delay_ms: 5,
            retry_max_delay_ms: 40,
            ..Default::default()
        });
        assert_eq!(policy.attempts, 0);
        assert_eq!(policy.max_delay, Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);

        let rows = fast(3)
            .run("list_links", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout))
                    } else {
                        Ok(vec!["abc"])
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(rows, vec!["abc"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_attempts() {
        let calls = AtomicU32::new(0);

        let result = fast(2)
            .run("clicks_in_window", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result = fast(3)
            .run("find_owned_link", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(DbErr::RecordNotFound("gone".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
