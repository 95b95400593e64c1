//! 数据模型定义
//!
//! HTTP 请求/响应体与业务实体，以及统一的业务错误码。

pub mod auth;
pub mod common;
pub mod files;
pub mod notifications;
pub mod submissions;
pub mod tasks;
pub mod users;

pub use common::{ApiResponse, ListResponse};

/// 为以小写字符串持久化的枚举生成 `as_str`、`Display`、`FromStr` 与反序列化实现
macro_rules! define_str_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(concat!("Invalid ", $label, ": {}"), s)),
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(|_| {
                    serde::de::Error::custom(format!(
                        concat!("无效的", $label, ": '{}'. 支持: {}"),
                        s,
                        [$($text),+].join(", ")
                    ))
                })
            }
        }
    };
}

pub(crate) use define_str_enum;

/// 应用启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// 响应体中的业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    ValidationFailed = 1001,
    Unauthorized = 1002,
    Forbidden = 1003,
    NotFound = 1004,
    RateLimitExceeded = 1005,
    InvalidOperation = 1006,

    // 认证与用户
    AuthFailed = 2000,
    RegisterFailed = 2001,
    UserNameInvalid = 2002,
    UserNameAlreadyExists = 2003,
    UserPasswordInvalid = 2004,

    InternalServerError = 5000,
    UpstreamUnavailable = 5003,
}
