pub mod login;
pub mod profile;
pub mod register;


use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::auth::requests::{LoginRequest, RegisterRequest};
use crate::storage::Storage;

pub struct AuthService {
    storage: Arc<dyn Storage>,
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub(crate) fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub(crate) fn get_config(&self) -> &AppConfig {
        AppConfig::get()
    }

    // 登录验证
    pub async fn login(&self, login_request: LoginRequest) -> ActixResult<HttpResponse> {
        login::handle_login(self, login_request).await
    }

    // 用户注册
    pub async fn register(&self, register_request: RegisterRequest) -> ActixResult<HttpResponse> {
        register::handle_register(self, register_request).await
    }

    // 获取当前用户信息
    pub async fn get_user(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        profile::handle_get_user(request).await
    }
}
