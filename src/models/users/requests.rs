use serde::Deserialize;

use super::entities::UserRole;

// 用户创建请求（存储层，密码已哈希）
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub department: Option<String>,
    pub year: Option<i32>,
}

// 学生名录查询参数
#[derive(Debug, Default, Deserialize)]
pub struct StudentListQuery {
    pub department: Option<String>,
    pub year: Option<i32>,
}
