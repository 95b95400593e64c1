use actix_multipart::Multipart;
use actix_web::http::header::ContentDisposition;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, guard, web};
use once_cell::sync::Lazy;

use crate::middlewares::{RateLimit, RequireJWT};
use crate::models::submissions::requests::{GradeSubmissionRequest, SubmissionListQuery};
use crate::models::submissions::responses::SubmissionReceipt;
use crate::models::{ApiResponse, ListResponse};
use crate::services::SubmissionService;
use crate::services::submissions::upload::read_submit_form;

static UPLOAD_LIMIT: Lazy<RateLimit> = Lazy::new(RateLimit::file_upload);

// 提交作业（multipart）
pub async fn submit(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    payload: Multipart,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let form = read_submit_form(payload, service.settings()).await?;

    let (submission, is_late) = service
        .submit(form.task_id, user.id, form.files, form.submission_text)
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(
        SubmissionReceipt {
            submission,
            is_late,
        },
        "Submission received",
    )))
}

// 列出提交：all=true 时按角色返回全部可见提交，否则返回自己的
pub async fn list_submissions(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    query: web::Query<SubmissionListQuery>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let items = if query.all {
        service.list_all(&user).await?
    } else {
        service.list_by_student(user.id).await?
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Submissions retrieved",
    )))
}

// 我的提交
pub async fn list_my_submissions(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let items = service.list_by_student(user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Submissions retrieved",
    )))
}

// 某任务的全部提交（任务所有者）
pub async fn list_task_submissions(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    path: web::Path<i64>, // task_id
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let items = service.list_by_task(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ListResponse::from(items),
        "Submissions retrieved",
    )))
}

// 获取提交详情
pub async fn get_submission(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let submission = service.get_by_id(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        submission,
        "Submission retrieved",
    )))
}

// 评分
pub async fn grade_submission(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    path: web::Path<i64>,
    body: web::Json<GradeSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let submission = service
        .grade(path.into_inner(), body.into_inner(), user.id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(submission, "Submission graded")))
}

// 退回已评分的提交
pub async fn reopen_submission(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let submission = service.reopen(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(submission, "Submission reopened")))
}

// 删除提交
pub async fn delete_submission(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    service.delete_submission(path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Submission deleted")))
}

// 下载附件
pub async fn download_file(
    req: HttpRequest,
    service: web::Data<SubmissionService>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let user = RequireJWT::require_user(&req)?;
    let (file, blob) = service.open_file(&path.into_inner(), user.id).await?;

    Ok(HttpResponse::Ok()
        .content_type(file.content_type.clone())
        .insert_header(ContentDisposition::attachment(file.original_name))
        .no_chunking(blob.size)
        .streaming(blob.stream))
}

// 配置路由
pub fn configure_submissions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/submissions")
            .wrap(RequireJWT)
            .service(
                web::resource("")
                    .guard(guard::Post())
                    .wrap(UPLOAD_LIMIT.clone())
                    .route(web::post().to(submit)),
            )
            .route("", web::get().to(list_submissions))
            // 固定路径放在 /{id} 之前
            .route("/mine", web::get().to(list_my_submissions))
            .route("/task/{task_id}", web::get().to(list_task_submissions))
            .route("/files/{file_id}", web::get().to(download_file))
            .route("/{id}", web::get().to(get_submission))
            .route("/{id}", web::delete().to(delete_submission))
            .route("/{id}/grade", web::put().to(grade_submission))
            .route("/{id}/reopen", web::post().to(reopen_submission)),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    use super::*;
    use crate::blob_store::MemoryBlobStore;
    use crate::models::tasks::entities::{AssignmentScope, SubmissionFormat, TaskStatus};
    use crate::models::tasks::requests::NewTask;
    use crate::models::users::entities::UserRole;
    use crate::models::users::requests::CreateUserRequest;
    use crate::notifier::NotifierHandle;
    use crate::services::submissions::UploadSettings;
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::SeaOrmStorage;
    use crate::utils::clock::ManualClock;
    use crate::utils::jwt::JwtUtils;

    const BOUNDARY: &str = "tracker-boundary";

    /// 手工拼装的 multipart 分段
    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, Option<&'a str>, &'a [u8]),
    }

    fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, data) => {
                    let disposition = match filename {
                        Some(f) => format!("form-data; name=\"{name}\"; filename=\"{f}\""),
                        None => format!("form-data; name=\"{name}\""),
                    };
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: {disposition}\r\nContent-Type: text/plain\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), body)
    }

    async fn bearer(
        storage: &Arc<dyn Storage>,
        name: &str,
        role: UserRole,
        year: Option<i32>,
    ) -> String {
        let user = storage
            .create_user(CreateUserRequest {
                username: name.to_string(),
                password_hash: "x".to_string(),
                display_name: None,
                role,
                department: Some("CS".to_string()),
                year,
            })
            .await
            .unwrap();
        let token = JwtUtils::generate_access_token(user.id, role.as_str()).unwrap();
        format!("Bearer {token}")
    }

    fn post(token: &str, parts: &[Part<'_>]) -> actix_test::TestRequest {
        let (content_type, body) = multipart(parts);
        actix_test::TestRequest::post()
            .uri("/api/v1/submissions")
            .insert_header(("Authorization", token.to_string()))
            .insert_header((CONTENT_TYPE, content_type))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_submission_routes() {
        let storage: Arc<dyn Storage> =
            Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
        let teacher = bearer(&storage, "route_teacher", UserRole::Teacher, None).await;
        let alice = bearer(&storage, "route_alice", UserRole::Student, Some(2)).await;
        let bob = bearer(&storage, "route_bob", UserRole::Student, Some(3)).await;
        let owner_id = storage
            .get_user_by_username("route_teacher")
            .await
            .unwrap()
            .unwrap()
            .id;
        let task = storage
            .create_task(NewTask {
                owner_id,
                title: "Lab".to_string(),
                description: None,
                scope: AssignmentScope::Year { target_year: 2 },
                due_date: Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()),
                allowed_file_types: vec!["txt".to_string()],
                max_file_size: 1024,
                submission_format: SubmissionFormat::Both,
                status: TaskStatus::Active,
            })
            .await
            .unwrap();
        let task_id = task.id.to_string();

        let service = SubmissionService::new(
            storage.clone(),
            Arc::new(MemoryBlobStore::new()),
            NotifierHandle::new(None, Duration::from_secs(1), storage.clone()),
            Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 1, 9, 12, 0, 0).unwrap(),
            )),
            UploadSettings {
                max_files: 5,
                max_size: 64,
                io_timeout: Duration::from_secs(1),
                store_retries: 1,
            },
        );

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(storage.clone()))
                .app_data(web::Data::new(service))
                .configure(configure_submissions_routes),
        )
        .await;

        // camelCase 字段名
        let req = post(
            &alice,
            &[
                Part::Text("taskId", &task_id),
                Part::File("files", Some("a.txt"), b"hello"),
            ],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let receipt: Value = actix_test::read_body_json(resp).await;
        assert_eq!(receipt["data"]["is_late"], false);
        assert_eq!(receipt["data"]["submission"]["task_id"], task.id);
        let file_id = receipt["data"]["submission"]["files"][0]["file_id"]
            .as_str()
            .unwrap()
            .to_string();

        // snake_case 别名与单数 file 字段
        let req = post(
            &alice,
            &[
                Part::Text("task_id", &task_id),
                Part::Text("submission_text", "notes"),
                Part::File("file", Some("b.txt"), b"world"),
            ],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let receipt: Value = actix_test::read_body_json(resp).await;
        assert_eq!(
            receipt["data"]["submission"]["files"].as_array().unwrap().len(),
            2
        );

        // 第六个文件在读取时即被拒绝
        let mut parts = vec![Part::Text("taskId", &task_id)];
        parts.extend((0..6).map(|_| Part::File("files", Some("x.txt"), b"x".as_slice())));
        let resp = actix_test::call_service(&app, post(&alice, &parts).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = post(
            &alice,
            &[
                Part::Text("taskId", &task_id),
                Part::File("files", None, b"anonymous"),
            ],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // 超过 upload.max_size 的文件在流式读取时截断
        let oversized = [b'a'; 100];
        let req = post(
            &alice,
            &[
                Part::Text("taskId", &task_id),
                Part::File("files", Some("big.txt"), &oversized),
            ],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = post(
            &alice,
            &[Part::Text("taskId", &task_id), Part::Text("comment", "hi")],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("comment"));

        let req = post(
            &alice,
            &[
                Part::Text("taskId", "999"),
                Part::File("files", Some("a.txt"), b"hello"),
            ],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // 不在任务范围内的学生
        let req = post(
            &bob,
            &[
                Part::Text("taskId", &task_id),
                Part::File("files", Some("a.txt"), b"hello"),
            ],
        ).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // 下载附件
        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/v1/submissions/files/{file_id}"))
            .insert_header(("Authorization", teacher.clone()))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        let disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("a.txt"));
        assert_eq!(actix_test::read_body(resp).await.as_ref(), b"hello");

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/v1/submissions/files/{file_id}"))
            .insert_header(("Authorization", bob.clone()))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/submissions/files/missing")
            .insert_header(("Authorization", alice))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
