use actix_multipart::Multipart;
use actix_web::http::header::ContentDisposition;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, guard, web};
use once_cell::sync::Lazy;

use crate::middlewares::{RateLimit, RequireJWT, RequireRole};
use crate::models::{ApiResponse, ListResponse};
use crate::models::tasks::requests::{CreateTaskRequest, UpdateTaskRequest};
use crate::models::users::entities::UserRole;
use crate::services::TaskService;
use crate::services::submissions::upload::read_file_form;

static REFERENCE_UPLOAD_LIMIT: Lazy<RateLimit> =
    Lazy::new(|| RateLimit::file_upload().with_prefix("reference_upload"));

// 创建任务
pub async fn create_task(
    req: HttpRequest,
    service: web::Data<TaskService>,
    body: web::Json<CreateTaskRequest>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let task = service.create(&user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(task, "Task created")))
}

// 列出任务
pub async fn list_tasks(
    req: HttpRequest,
    service: web::Data<TaskService>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let items = service.list(&user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Tasks retrieved",
    )))
}

// 获取任务详情
pub async fn get_task(
    req: HttpRequest,
    service: web::Data<TaskService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let task = service.get(&user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(task, "Task retrieved")))
}

// 修改任务
pub async fn update_task(
    req: HttpRequest,
    service: web::Data<TaskService>,
    path: web::Path<i64>,
    body: web::Json<UpdateTaskRequest>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let task = service
        .update(&user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(task, "Task updated")))
}

// 删除任务
pub async fn delete_task(
    req: HttpRequest,
    service: web::Data<TaskService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    service.delete(&user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Task deleted")))
}

// 上传参考资料（multipart）
pub async fn attach_references(
    req: HttpRequest,
    service: web::Data<TaskService>,
    path: web::Path<i64>,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let files = read_file_form(payload, service.settings()).await?;
    let items = service
        .attach_references(&user, path.into_inner(), files)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(
        ListResponse::from(items),
        "Reference files attached",
    )))
}

// 参考资料列表
pub async fn list_references(
    req: HttpRequest,
    service: web::Data<TaskService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let items = service.list_references(&user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Reference files retrieved",
    )))
}

// 下载参考资料
pub async fn download_reference(
    req: HttpRequest,
    service: web::Data<TaskService>,
    path: web::Path<(i64, String)>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let (task_id, file_id) = path.into_inner();
    let (file, blob) = service.open_reference(&user, task_id, &file_id).await?;

    Ok(HttpResponse::Ok()
        .content_type(file.content_type.clone())
        .insert_header(ContentDisposition::attachment(file.original_name))
        .no_chunking(blob.size)
        .streaming(blob.stream))
}

// 配置路由
pub fn configure_tasks_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/tasks")
            .wrap(RequireJWT)
            .service(
                web::resource("")
                    .guard(guard::Post())
                    .wrap(RequireRole::new_any(UserRole::teacher_roles()))
                    .route(web::post().to(create_task)),
            )
            .route("", web::get().to(list_tasks))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::delete().to(delete_task))
            .service(
                web::resource("/{id}/references")
                    .guard(guard::Post())
                    .wrap(REFERENCE_UPLOAD_LIMIT.clone())
                    .route(web::post().to(attach_references)),
            )
            .route("/{id}/references", web::get().to(list_references))
            .route(
                "/{id}/references/{file_id}",
                web::get().to(download_reference),
            ),
    );
}
