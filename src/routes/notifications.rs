use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};

use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ListResponse};
use crate::services::NotificationService;

// 当前用户的站内通知
pub async fn list_notifications(
    req: HttpRequest,
    service: web::Data<NotificationService>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let items = service.list(user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Notifications retrieved",
    )))
}

// 配置路由
pub fn configure_notifications_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .wrap(RequireJWT)
            .route("", web::get().to(list_notifications)),
    );
}
