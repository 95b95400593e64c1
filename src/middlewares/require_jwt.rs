/*!
 * JWT 认证中间件
 *
 * 验证 `Authorization: Bearer <token>`，并把当前用户放入请求扩展中。
 *
 * ## 使用方法
 *
 * ```rust,ignore
 * use actix_web::{web, App};
 * use crate::middlewares::RequireJWT;
 *
 * App::new().service(
 *     web::scope("/api/v1/submissions")
 *         .wrap(RequireJWT)
 *         .route("/mine", web::get().to(list_mine)),
 * );
 *
 * async fn list_mine(req: HttpRequest) -> ActixResult<HttpResponse> {
 *     let user = RequireJWT::require_user(&req)?;
 *     // ...
 * }
 * ```
 *
 * ## 认证流程
 *
 * 1. 提取并验证令牌签名与有效期
 * 2. 先查用户缓存（键为 `user:<token>`），未命中再查存储
 * 3. 停用的账号视为认证失败
 * 4. 用户写入请求扩展，供处理程序使用
 */

use crate::cache::{CacheResult, ObjectCache};
use crate::config::AppConfig;
use crate::errors::TrackerError;
use crate::models::users::entities::{self, UserRole};
use crate::models::ErrorCode;
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::{rc::Rc, sync::Arc};
use tracing::{debug, info};

use super::create_error_response;

const BEARER_PREFIX: &str = "Bearer ";
const AUTHORIZATION_HEADER: &str = "Authorization";

#[derive(Clone)]
pub struct RequireJWT;

// 提取并验证 JWT access token，返回当前用户
async fn extract_and_validate_jwt(req: &ServiceRequest) -> Result<entities::User, String> {
    let token = req
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| "Missing or invalid Authorization header".to_string())?;

    let claims = JwtUtils::verify_access_token(token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        "Invalid JWT token".to_string()
    })?;

    let cache = req
        .app_data::<actix_web::web::Data<Arc<dyn ObjectCache>>>()
        .map(|data| data.get_ref().clone());
    let cache_key = format!("user:{token}");

    // 从缓存中获取用户信息
    if let Some(cache) = &cache {
        match cache.get_raw(&cache_key).await {
            CacheResult::Found(json) => match serde_json::from_str::<entities::User>(&json) {
                Ok(user) => return Ok(user),
                Err(_) => {
                    cache.remove(&cache_key).await;
                    info!("Failed to deserialize cached user for subject {}", claims.sub);
                }
            },
            CacheResult::NotFound => {
                debug!("User {} not found in cache", claims.sub);
            }
        }
    }

    let storage = req
        .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| "Storage is not configured".to_string())?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| "Invalid user ID in JWT".to_string())?;

    let user = storage
        .get_user_by_id(user_id)
        .await
        .map_err(|_| "Failed to retrieve user from storage".to_string())?
        .ok_or_else(|| "User not found".to_string())?;

    if !user.is_active() {
        return Err("User is not active".to_string());
    }

    // 将用户信息存入缓存
    if let Some(cache) = &cache
        && let Ok(user_json) = serde_json::to_string(&user)
    {
        cache
            .insert_raw(cache_key, user_json, AppConfig::get().cache.default_ttl)
            .await;
    }

    Ok(user)
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 处理 OPTIONS 请求
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            match extract_and_validate_jwt(&req).await {
                Ok(user) => {
                    debug!("JWT authentication successful for ID: {}", user.id);
                    req.extensions_mut().insert(user);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(err) => {
                    info!(
                        "JWT authentication failed for request to {}: {}",
                        req.path(),
                        err
                    );
                    Ok(req.into_response(
                        create_error_response(
                            StatusCode::UNAUTHORIZED,
                            ErrorCode::Unauthorized,
                            &format!("Unauthorized: {err}"),
                        )
                        .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

// 辅助函数：从请求中提取用户信息
impl RequireJWT {
    /// 从请求扩展中提取当前用户
    /// 此函数应该在应用了RequireJWT中间件的路由处理程序中使用
    pub fn extract_user_claims(req: &actix_web::HttpRequest) -> Option<entities::User> {
        req.extensions().get::<entities::User>().cloned()
    }

    /// 同上，缺失时返回认证错误，便于处理程序直接使用 `?`
    pub fn require_user(req: &actix_web::HttpRequest) -> Result<entities::User, TrackerError> {
        Self::extract_user_claims(req)
            .ok_or_else(|| TrackerError::authentication("Authentication required"))
    }

    /// 从请求扩展中提取用户角色
    pub fn extract_user_role(req: &actix_web::HttpRequest) -> Option<UserRole> {
        req.extensions()
            .get::<entities::User>()
            .map(|user| user.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaCacheWrapper;
    use crate::models::users::requests::CreateUserRequest;
    use crate::storage::sea_orm_storage::SeaOrmStorage;
    use actix_web::{App, HttpRequest, HttpResponse, test as actix_test, web};

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match RequireJWT::extract_user_claims(&req) {
            Some(user) => HttpResponse::Ok().body(user.username),
            None => HttpResponse::InternalServerError().finish(),
        }
    }

    #[actix_web::test]
    async fn test_bearer_token_resolves_user() {
        let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
        let cache: Arc<dyn ObjectCache> =
            Arc::new(MokaCacheWrapper::new(&AppConfig::get().cache));
        let user = storage
            .create_user(CreateUserRequest {
                username: "alice01".to_string(),
                password_hash: "x".to_string(),
                display_name: None,
                role: UserRole::Student,
                department: None,
                year: None,
            })
            .await
            .unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(storage.clone()))
                .app_data(web::Data::new(cache.clone()))
                .service(
                    web::scope("/api")
                        .wrap(RequireJWT)
                        .route("/me", web::get().to(whoami)),
                ),
        )
        .await;

        let token = JwtUtils::generate_access_token(user.id, "student").unwrap();
        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/me")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "alice01");

        // 用户已写入缓存
        assert!(matches!(
            cache.get_raw(&format!("user:{token}")).await,
            CacheResult::Found(_)
        ));

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/me").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/me")
                .insert_header(("Authorization", "Bearer not-a-token"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
