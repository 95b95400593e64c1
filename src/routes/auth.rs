use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::auth::requests::{LoginRequest, RegisterRequest};
use crate::services::AuthService;

// 各 worker 共享同一组计数
static LOGIN_LIMIT: Lazy<RateLimit> = Lazy::new(RateLimit::login);
static REGISTER_LIMIT: Lazy<RateLimit> = Lazy::new(RateLimit::register);

pub async fn login(
    service: web::Data<AuthService>,
    user_data: web::Json<LoginRequest>,
) -> ActixResult<HttpResponse> {
    service.login(user_data.into_inner()).await
}

pub async fn register(
    service: web::Data<AuthService>,
    user_data: web::Json<RegisterRequest>,
) -> ActixResult<HttpResponse> {
    service.register(user_data.into_inner()).await
}

pub async fn get_user(
    service: web::Data<AuthService>,
    request: HttpRequest,
) -> ActixResult<HttpResponse> {
    service.get_user(&request).await
}

// 配置路由
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/auth")
            .service(
                web::resource("/login")
                    .wrap(LOGIN_LIMIT.clone())
                    .route(web::post().to(login)),
            )
            .service(
                web::resource("/register")
                    .wrap(REGISTER_LIMIT.clone())
                    .route(web::post().to(register)),
            )
            .service(
                web::scope("")
                    .wrap(middlewares::RequireJWT)
                    .route("/me", web::get().to(get_user)),
            ),
    );
}
