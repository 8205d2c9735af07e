use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LinkTrackerError {
    Validation(Vec<FieldError>),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    IdentityProvider(String),
    PasswordHash(String),
    Serialization(String),
    FileOperation(String),
    Export(String),
}

impl LinkTrackerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            LinkTrackerError::Validation(_) => "E001",
            LinkTrackerError::Unauthorized(_) => "E002",
            LinkTrackerError::Forbidden(_) => "E003",
            LinkTrackerError::NotFound(_) => "E004",
            LinkTrackerError::DatabaseConfig(_) => "E005",
            LinkTrackerError::DatabaseConnection(_) => "E006",
            LinkTrackerError::DatabaseOperation(_) => "E007",
            LinkTrackerError::IdentityProvider(_) => "E008",
            LinkTrackerError::PasswordHash(_) => "E009",
            LinkTrackerError::Serialization(_) => "E010",
            LinkTrackerError::FileOperation(_) => "E011",
            LinkTrackerError::Export(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            LinkTrackerError::Validation(_) => "Validation Error",
            LinkTrackerError::Unauthorized(_) => "Unauthorized",
            LinkTrackerError::Forbidden(_) => "Forbidden",
            LinkTrackerError::NotFound(_) => "Resource Not Found",
            LinkTrackerError::DatabaseConfig(_) => "Database Configuration Error",
            LinkTrackerError::DatabaseConnection(_) => "Database Connection Error",
            LinkTrackerError::DatabaseOperation(_) => "Database Operation Error",
            LinkTrackerError::IdentityProvider(_) => "Identity Provider Error",
            LinkTrackerError::PasswordHash(_) => "Password Hash Error",
            LinkTrackerError::Serialization(_) => "Serialization Error",
            LinkTrackerError::FileOperation(_) => "File Operation Error",
            LinkTrackerError::Export(_) => "Export Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> String {
        match self {
            LinkTrackerError::Validation(fields) => match fields.as_slice() {
                [] => "Validation failed".to_string(),
                [single] => single.message.clone(),
                _ => "Validation failed".to_string(),
            },
            LinkTrackerError::Unauthorized(msg)
            | LinkTrackerError::Forbidden(msg)
            | LinkTrackerError::NotFound(msg)
            | LinkTrackerError::DatabaseConfig(msg)
            | LinkTrackerError::DatabaseConnection(msg)
            | LinkTrackerError::DatabaseOperation(msg)
            | LinkTrackerError::IdentityProvider(msg)
            | LinkTrackerError::PasswordHash(msg)
            | LinkTrackerError::Serialization(msg)
            | LinkTrackerError::FileOperation(msg)
            | LinkTrackerError::Export(msg) => msg.clone(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            LinkTrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            LinkTrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LinkTrackerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LinkTrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于启动阶段的致命错误）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LinkTrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LinkTrackerError {}

// 便捷的构造函数
impl LinkTrackerError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        LinkTrackerError::Validation(errors)
    }

    pub fn invalid_field<F: Into<String>, M: Into<String>>(field: F, msg: M) -> Self {
        LinkTrackerError::Validation(vec![FieldError::new(field, msg)])
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::Forbidden(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::NotFound(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::DatabaseOperation(msg.into())
    }

    pub fn identity_provider<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::IdentityProvider(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::PasswordHash(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::FileOperation(msg.into())
    }

    pub fn export<T: Into<String>>(msg: T) -> Self {
        LinkTrackerError::Export(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

fn is_production() -> bool {
    crate::config::try_get_config()
        .map(|c| c.server.is_production())
        .unwrap_or(false)
}

impl ResponseError for LinkTrackerError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.http_status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self.format_simple());
        }

        let error = if status.is_server_error() && is_production() {
            "Internal server error".to_string()
        } else {
            self.message()
        };
        let errors = match self {
            LinkTrackerError::Validation(fields) if !fields.is_empty() => Some(fields.as_slice()),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorBody {
            success: false,
            error,
            errors,
        })
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for LinkTrackerError {
    fn from(err: sea_orm::DbErr) -> Self {
        LinkTrackerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for LinkTrackerError {
    fn from(err: std::io::Error) -> Self {
        LinkTrackerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for LinkTrackerError {
    fn from(err: serde_json::Error) -> Self {
        LinkTrackerError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for LinkTrackerError {
    fn from(err: csv::Error) -> Self {
        LinkTrackerError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LinkTrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            LinkTrackerError::invalid_field("original_url", "bad").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LinkTrackerError::forbidden("x").http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LinkTrackerError::database_operation("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_single_field_error_surfaces_its_message() {
        let err = LinkTrackerError::invalid_field("format", "Format must be json or csv");
        assert_eq!(err.message(), "Format must be json or csv");

        let err = LinkTrackerError::validation(vec![
            FieldError::new("a", "first"),
            FieldError::new("b", "second"),
        ]);
        assert_eq!(err.message(), "Validation failed");
    }
}
