use serde::Deserialize;

use crate::models::users::entities::UserRole;

// 用户登录请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// 用户注册请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    /// 仅允许 student / teacher，管理员只能由配置创建
    pub role: UserRole,
    pub department: Option<String>,
    pub year: Option<i32>,
}
