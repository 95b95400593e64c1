use actix_web::{HttpResponse, Result as ActixResult, web};

use crate::middlewares::{RequireJWT, RequireRole};
use crate::models::users::{entities::UserRole, requests::StudentListQuery};
use crate::models::{ApiResponse, ListResponse};
use crate::services::UserService;

// 学生名录（教师、管理员）
pub async fn list_students(
    service: web::Data<UserService>,
    query: web::Query<StudentListQuery>,
) -> ActixResult<HttpResponse> {
    let items = service.list_students(&query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Students retrieved",
    )))
}

// 配置路由
pub fn configure_users_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/users")
            .wrap(RequireJWT)
            .service(
                web::scope("")
                    .wrap(RequireRole::new_any(UserRole::teacher_roles()))
                    .route("/students", web::get().to(list_students)),
            ),
    );
}
