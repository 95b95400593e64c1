//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。
//! 业务错误（NotFound、Forbidden 等）直接映射到 HTTP 状态码，
//! 基础设施错误统一以 500 返回且不向客户端暴露细节。

use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};

use crate::models::{ApiResponse, ErrorCode};

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_tracker_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum TrackerError {
            $($variant(String),)*
        }

        impl TrackerError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(TrackerError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(TrackerError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(TrackerError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl TrackerError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        TrackerError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_tracker_errors! {
    DatabaseConfig("E003", "Database Configuration Error"),
    DatabaseConnection("E004", "Database Connection Error"),
    DatabaseOperation("E005", "Database Operation Error"),
    FileOperation("E006", "File Operation Error"),
    InvalidArgument("E007", "Invalid Argument"),
    NotFound("E008", "Resource Not Found"),
    Serialization("E009", "Serialization Error"),
    BlobStorePluginNotFound("E010", "Blob Store Plugin Not Found"),
    DateParse("E011", "Date Parse Error"),
    Authentication("E012", "Authentication Error"),
    Forbidden("E013", "Forbidden"),
    InvalidOperation("E014", "Invalid Operation"),
    UpstreamUnavailable("E015", "Upstream Unavailable"),
    PartialFailure("E016", "Partial Failure"),
}

impl TrackerError {
    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 对应的 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Forbidden(_) => StatusCode::FORBIDDEN,
            TrackerError::InvalidArgument(_) | TrackerError::InvalidOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 对应的响应体业务码
    pub fn error_code(&self) -> ErrorCode {
        match self {
            TrackerError::NotFound(_) => ErrorCode::NotFound,
            TrackerError::Forbidden(_) => ErrorCode::Forbidden,
            TrackerError::InvalidArgument(_) => ErrorCode::ValidationFailed,
            TrackerError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            TrackerError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            TrackerError::Authentication(_) => ErrorCode::Unauthorized,
            _ => ErrorCode::InternalServerError,
        }
    }

    /// 是否值得重试（仅限上游暂时不可用）
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::UpstreamUnavailable(_))
    }

    /// 返回给客户端的消息，内部错误与上游错误都不暴露细节
    pub fn public_message(&self) -> String {
        match self {
            TrackerError::UpstreamUnavailable(_) => {
                "File storage temporarily unavailable, please retry later".to_string()
            }
            _ if self.http_status().is_server_error() => "Internal server error".to_string(),
            _ => self.message().to_string(),
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for TrackerError {}

impl ResponseError for TrackerError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!("{} {}: {}", self.code(), self.error_type(), self.message());
        } else {
            tracing::debug!("{} {}: {}", self.code(), self.error_type(), self.message());
        }
        HttpResponse::build(status).json(ApiResponse::error_empty(
            self.error_code(),
            self.public_message(),
        ))
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for TrackerError {
    fn from(err: sea_orm::DbErr) -> Self {
        TrackerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for TrackerError {
    fn from(err: chrono::ParseError) -> Self {
        TrackerError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TrackerError::database_config("test").code(), "E003");
        assert_eq!(TrackerError::invalid_argument("test").code(), "E007");
        assert_eq!(TrackerError::authentication("test").code(), "E012");
        assert_eq!(TrackerError::partial_failure("test").code(), "E016");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            TrackerError::forbidden("test").error_type(),
            "Forbidden"
        );
        assert_eq!(
            TrackerError::invalid_argument("test").error_type(),
            "Invalid Argument"
        );
    }

    #[test]
    fn test_error_message() {
        let err = TrackerError::invalid_argument("Invalid input");
        assert_eq!(err.message(), "Invalid input");
    }

    #[test]
    fn test_format_simple() {
        let err = TrackerError::not_found("Submission 7");
        let formatted = err.format_simple();
        assert!(formatted.contains("Resource Not Found"));
        assert!(formatted.contains("Submission 7"));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(TrackerError::not_found("x").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(TrackerError::forbidden("x").http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            TrackerError::invalid_argument("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrackerError::invalid_operation("x").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TrackerError::upstream_unavailable("x").http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            TrackerError::authentication("x").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TrackerError::database_operation("x").http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = TrackerError::database_operation("UNIQUE constraint failed: submissions.id");
        assert_eq!(err.public_message(), "Internal server error");

        let err = TrackerError::forbidden("not assigned to this task");
        assert_eq!(err.public_message(), "not assigned to this task");

        // 存储细节（文件 ID、系统错误）只写日志
        let err = TrackerError::upstream_unavailable(
            "failed to store 'a.pdf' after 3 attempt(s): blob store write failed for \
             1b4e28ba-2fa1-11d2-883f-0016d3cca427: Permission denied (os error 13)",
        );
        let public = err.public_message();
        assert!(!public.contains("1b4e28ba"));
        assert!(!public.contains("os error"));
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_only_upstream_errors_are_retryable() {
        assert!(TrackerError::upstream_unavailable("timeout").is_retryable());
        assert!(!TrackerError::invalid_argument("bad").is_retryable());
        assert!(!TrackerError::forbidden("no").is_retryable());
    }
}
