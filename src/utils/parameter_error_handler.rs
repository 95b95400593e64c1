//! actix-web 提取器错误处理
//!
//! 将 JSON、查询参数和路径参数的解析失败统一转换为 400 + ApiResponse。

use actix_web::error::{InternalError, JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse};

use crate::models::{ApiResponse, ErrorCode};

fn bad_request<E>(err: E, message: String) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    tracing::debug!("Rejected request parameters: {}", message);
    let response =
        HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, message));
    InternalError::from_response(err, response).into()
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid JSON body: {err}");
    bad_request(err, message)
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid query parameters: {err}");
    bad_request(err, message)
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid path parameter: {err}");
    bad_request(err, message)
}
