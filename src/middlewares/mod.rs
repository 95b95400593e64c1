//! HTTP 中间件
//!
//! - `RequireJWT`: 令牌认证
//! - `RequireRole`: 角色检查，须在 `RequireJWT` 之后
//! - `RateLimit`: 请求频率限制

pub mod rate_limit;
pub mod require_jwt;
pub mod require_role;

use actix_web::{HttpResponse, http::StatusCode};

use crate::models::{ApiResponse, ErrorCode};

pub use rate_limit::RateLimit;
pub use require_jwt::RequireJWT;
pub use require_role::RequireRole;

// 中间件统一的错误响应
pub(crate) fn create_error_response(
    status: StatusCode,
    code: ErrorCode,
    message: &str,
) -> HttpResponse {
    if status == StatusCode::NO_CONTENT {
        return HttpResponse::build(status).finish();
    }
    HttpResponse::build(status).json(ApiResponse::<()>::error_empty(code, message))
}
