use actix_web::{HttpResponse, Result as ActixResult};

use crate::models::auth::requests::RegisterRequest;
use crate::models::users::{entities::UserRole, requests::CreateUserRequest};
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::password::hash_password;
use crate::utils::validate::{validate_password, validate_username};

use super::AuthService;

pub async fn handle_register(
    service: &AuthService,
    register_request: RegisterRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.storage();

    // 管理员只能由启动时的配置创建
    if register_request.role == UserRole::Admin {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::RegisterFailed,
            "Admin accounts cannot be registered",
        )));
    }

    // 1. 验证用户名合法性
    if let Err(msg) = validate_username(&register_request.username) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::UserNameInvalid, msg)));
    }

    // 2. 验证密码策略
    let password_check = validate_password(&register_request.password);
    if !password_check.is_valid {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::UserPasswordInvalid,
            password_check.error_message(),
        )));
    }

    // 3. 检查用户名是否已存在
    match storage.get_user_by_username(&register_request.username).await {
        Ok(Some(_)) => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::UserNameAlreadyExists,
                "Username already exists",
            )));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Register lookup failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::RegisterFailed,
                    "Register failed",
                )),
            );
        }
    }

    // 4. 哈希密码
    let password_hash = match hash_password(&register_request.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Password hashing failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::RegisterFailed,
                    "Register failed",
                )),
            );
        }
    };

    // 5. 创建用户
    let create_request = CreateUserRequest {
        username: register_request.username,
        password_hash,
        display_name: register_request
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        role: register_request.role,
        department: register_request
            .department
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        year: register_request.year,
    };

    match storage.create_user(create_request).await {
        Ok(user) => {
            tracing::info!("User {} registered as {}", user.username, user.role);
            Ok(HttpResponse::Created().json(ApiResponse::success(user, "Register successful")))
        }
        Err(e) => {
            tracing::error!("Register failed: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::RegisterFailed,
                    "Register failed",
                )),
            )
        }
    }
}
