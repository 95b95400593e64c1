use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::TryStreamExt;

use super::TaskService;
use crate::blob_store::{BlobMetadata, BlobStore, MemoryBlobStore};
use crate::errors::TrackerError;
use crate::models::files::entities::{FileRef, UploadedFile};
use crate::models::tasks::entities::{AssignmentScope, AssignmentType, TaskStatus};
use crate::models::tasks::requests::{CreateTaskRequest, UpdateTaskRequest};
use crate::models::users::entities::{User, UserRole};
use crate::models::users::requests::CreateUserRequest;
use crate::storage::sea_orm_storage::SeaOrmStorage;
use crate::services::submissions::UploadSettings;
use crate::storage::{Storage, SubmissionUpsert};

fn service(storage: &Arc<dyn Storage>, blobs: Arc<MemoryBlobStore>) -> TaskService {
    TaskService::new(
        storage.clone(),
        blobs,
        UploadSettings {
            max_files: 2,
            max_size: 1024,
            io_timeout: Duration::from_secs(1),
            store_retries: 0,
        },
    )
}

fn text_file(name: &str, body: &'static [u8]) -> UploadedFile {
    UploadedFile {
        original_name: name.to_string(),
        content_type: "text/plain".to_string(),
        data: Bytes::from_static(body),
    }
}

async fn user(storage: &Arc<dyn Storage>, name: &str, role: UserRole, dept: Option<&str>) -> User {
    storage
        .create_user(CreateUserRequest {
            username: name.to_string(),
            password_hash: "x".to_string(),
            display_name: None,
            role,
            department: dept.map(str::to_string),
            year: Some(1),
        })
        .await
        .unwrap()
}

fn request(kind: AssignmentType) -> CreateTaskRequest {
    CreateTaskRequest {
        title: "  Lab report ".to_string(),
        description: None,
        assignment_type: kind,
        assignee_id: None,
        target_department: None,
        target_year: None,
        due_date: None,
        allowed_file_types: Some(vec![".PDF".to_string(), "txt".to_string()]),
        max_file_size: None,
        submission_format: None,
        status: None,
    }
}

#[tokio::test]
async fn test_create_and_visibility() {
    let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
    let service = service(&storage, Arc::new(MemoryBlobStore::new()));
    let teacher = user(&storage, "teach", UserRole::Teacher, None).await;
    let cs = user(&storage, "alice", UserRole::Student, Some("cs")).await;
    let math = user(&storage, "bob", UserRole::Student, Some("math")).await;

    let mut req = request(AssignmentType::Department);
    req.target_department = Some("CS".to_string());
    let task = service.create(&teacher, req).await.unwrap();
    assert_eq!(task.title, "Lab report");
    assert_eq!(task.allowed_file_types, ["pdf", "txt"]);
    assert_eq!(task.status, TaskStatus::Active);
    assert_eq!(
        task.scope,
        AssignmentScope::Department {
            target_department: "CS".to_string()
        }
    );

    assert_eq!(service.list(&teacher).await.unwrap().len(), 1);
    assert_eq!(service.list(&cs).await.unwrap().len(), 1);
    assert!(service.list(&math).await.unwrap().is_empty());

    assert!(service.get(&cs, task.id).await.is_ok());
    assert!(matches!(
        service.get(&math, task.id).await,
        Err(TrackerError::Forbidden(_))
    ));
    assert!(matches!(
        service.get(&math, 999).await,
        Err(TrackerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_create_rejections() {
    let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
    let service = service(&storage, Arc::new(MemoryBlobStore::new()));
    let teacher = user(&storage, "teach", UserRole::Teacher, None).await;
    let student = user(&storage, "alice", UserRole::Student, None).await;

    let mut req = request(AssignmentType::Individual);
    req.assignee_id = Some(student.id);
    assert!(matches!(
        service.create(&student, req).await,
        Err(TrackerError::Forbidden(_))
    ));

    // 范围字段与声明不符
    let mut req = request(AssignmentType::Individual);
    req.target_year = Some(1);
    assert!(matches!(
        service.create(&teacher, req).await,
        Err(TrackerError::InvalidArgument(_))
    ));

    // 指派给教师
    let mut req = request(AssignmentType::Individual);
    req.assignee_id = Some(teacher.id);
    assert!(matches!(
        service.create(&teacher, req).await,
        Err(TrackerError::InvalidArgument(_))
    ));

    let mut req = request(AssignmentType::Year);
    req.target_year = Some(1);
    req.max_file_size = Some(0);
    assert!(matches!(
        service.create(&teacher, req).await,
        Err(TrackerError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_delete_cascades_to_blobs() {
    let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
    let blobs = Arc::new(MemoryBlobStore::new());
    let service = service(&storage, blobs.clone());
    let teacher = user(&storage, "teach", UserRole::Teacher, None).await;
    let other = user(&storage, "teach2", UserRole::Teacher, None).await;
    let student = user(&storage, "alice", UserRole::Student, None).await;

    let mut req = request(AssignmentType::Individual);
    req.assignee_id = Some(student.id);
    let task = service.create(&teacher, req).await.unwrap();

    let file_id = blobs
        .store(Bytes::from_static(b"%PDF"), "application/pdf", BlobMetadata::new())
        .await
        .unwrap();
    storage
        .upsert_submission(SubmissionUpsert {
            task_id: task.id,
            student_id: student.id,
            submission_text: None,
            files: vec![FileRef {
                file_id: file_id.clone(),
                original_name: "a.pdf".to_string(),
                size_bytes: 4,
                content_type: "application/pdf".to_string(),
                uploaded_at: chrono::Utc::now(),
            }],
            submitted_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

    assert!(matches!(
        service.delete(&other, task.id).await,
        Err(TrackerError::Forbidden(_))
    ));

    service.delete(&teacher, task.id).await.unwrap();
    assert!(!blobs.contains(&file_id));
    assert!(storage.list_all_submissions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_is_owner_only_and_revalidated() {
    let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
    let service = service(&storage, Arc::new(MemoryBlobStore::new()));
    let teacher = user(&storage, "teach", UserRole::Teacher, None).await;
    let other = user(&storage, "teach2", UserRole::Teacher, None).await;
    let student = user(&storage, "alice", UserRole::Student, Some("cs")).await;

    let mut req = request(AssignmentType::Department);
    req.target_department = Some("CS".to_string());
    let task = service.create(&teacher, req).await.unwrap();

    let close = || UpdateTaskRequest {
        status: Some(TaskStatus::Closed),
        ..Default::default()
    };
    assert!(matches!(
        service.update(&other, task.id, close()).await,
        Err(TrackerError::Forbidden(_))
    ));
    assert!(matches!(
        service.update(&teacher, 999, close()).await,
        Err(TrackerError::NotFound(_))
    ));

    let closed = service.update(&teacher, task.id, close()).await.unwrap();
    assert_eq!(closed.status, TaskStatus::Closed);
    assert_eq!(closed.title, "Lab report");
    // 关闭后学生的任务列表不再包含它
    assert!(service.list(&student).await.unwrap().is_empty());

    // 改为直接指派给教师
    let update = UpdateTaskRequest {
        assignment_type: Some(AssignmentType::Individual),
        assignee_id: Some(other.id),
        ..Default::default()
    };
    assert!(matches!(
        service.update(&teacher, task.id, update).await,
        Err(TrackerError::InvalidArgument(_))
    ));

    let update = UpdateTaskRequest {
        assignment_type: Some(AssignmentType::Individual),
        assignee_id: Some(student.id),
        target_year: Some(1),
        ..Default::default()
    };
    assert!(matches!(
        service.update(&teacher, task.id, update).await,
        Err(TrackerError::InvalidArgument(_))
    ));

    let update = UpdateTaskRequest {
        assignment_type: Some(AssignmentType::Individual),
        assignee_id: Some(student.id),
        status: Some(TaskStatus::Active),
        ..Default::default()
    };
    let moved = service.update(&teacher, task.id, update).await.unwrap();
    assert_eq!(
        moved.scope,
        AssignmentScope::Individual {
            assignee_id: student.id
        }
    );
    let stored = storage.get_task_by_id(task.id).await.unwrap().unwrap();
    assert_eq!(stored.scope, moved.scope);
    assert_eq!(stored.status, TaskStatus::Active);
}

#[tokio::test]
async fn test_reference_files_attach_download_and_cleanup() {
    let storage: Arc<dyn Storage> = Arc::new(SeaOrmStorage::open_in_memory().await.unwrap());
    let blobs = Arc::new(MemoryBlobStore::new());
    let service = service(&storage, blobs.clone());
    let teacher = user(&storage, "teach", UserRole::Teacher, None).await;
    let alice = user(&storage, "alice", UserRole::Student, Some("cs")).await;
    let bob = user(&storage, "bob", UserRole::Student, Some("math")).await;

    let mut req = request(AssignmentType::Department);
    req.target_department = Some("cs".to_string());
    let task = service.create(&teacher, req).await.unwrap();

    assert!(matches!(
        service
            .attach_references(&alice, task.id, vec![text_file("a.txt", b"guide")])
            .await,
        Err(TrackerError::Forbidden(_))
    ));

    let files = service
        .attach_references(&teacher, task.id, vec![text_file("guide.txt", b"read me")])
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert!(blobs.contains(&files[0].file_id));

    // 总数超过上限
    let batch = vec![text_file("b.txt", b"b"), text_file("c.txt", b"c")];
    assert!(matches!(
        service.attach_references(&teacher, task.id, batch).await,
        Err(TrackerError::InvalidArgument(_))
    ));

    // 存储失败时不留下记录
    blobs.fail_next_stores(1);
    assert!(
        service
            .attach_references(&teacher, task.id, vec![text_file("d.txt", b"d")])
            .await
            .is_err()
    );
    assert_eq!(storage.list_task_files(task.id).await.unwrap().len(), 1);
    assert_eq!(blobs.len(), 1);

    let (file, blob) = service
        .open_reference(&alice, task.id, &files[0].file_id)
        .await
        .unwrap();
    assert_eq!(file.original_name, "guide.txt");
    let chunks: Vec<Bytes> = blob.stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"read me");

    assert!(matches!(
        service.open_reference(&bob, task.id, &files[0].file_id).await,
        Err(TrackerError::Forbidden(_))
    ));
    assert!(matches!(
        service.open_reference(&alice, task.id, "missing").await,
        Err(TrackerError::NotFound(_))
    ));

    service.delete(&teacher, task.id).await.unwrap();
    assert!(blobs.is_empty());
}
