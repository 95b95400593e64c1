use chrono::{TimeZone, Utc};

use super::SeaOrmStorage;
use crate::models::files::entities::FileRef;
use crate::models::notifications::entities::{NewNotification, NotificationKind};
use crate::models::submissions::entities::SubmissionStatus;
use crate::models::tasks::entities::{AssignmentScope, SubmissionFormat, Task, TaskStatus};
use crate::models::tasks::requests::NewTask;
use crate::models::users::entities::{User, UserRole};
use crate::models::users::requests::CreateUserRequest;
use crate::storage::{GradeUpdate, GuardedDelete, Storage, SubmissionUpsert};

async fn user(
    storage: &SeaOrmStorage,
    username: &str,
    role: UserRole,
    department: Option<&str>,
    year: Option<i32>,
) -> User {
    storage
        .create_user(CreateUserRequest {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            display_name: Some(username.to_uppercase()),
            role,
            department: department.map(str::to_string),
            year,
        })
        .await
        .unwrap()
}

async fn task(storage: &SeaOrmStorage, owner_id: i64, scope: AssignmentScope) -> Task {
    storage
        .create_task(NewTask {
            owner_id,
            title: "Lab".to_string(),
            description: Some("Write it up".to_string()),
            scope,
            due_date: Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()),
            allowed_file_types: vec!["pdf".to_string(), "txt".to_string()],
            max_file_size: 1024,
            submission_format: SubmissionFormat::Both,
            status: TaskStatus::Active,
        })
        .await
        .unwrap()
}

fn file_ref(id: &str) -> FileRef {
    FileRef {
        file_id: id.to_string(),
        original_name: format!("{id}.pdf"),
        size_bytes: 10,
        content_type: "application/pdf".to_string(),
        uploaded_at: Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap(),
    }
}

fn upsert(task_id: i64, student_id: i64, files: &[&str], text: Option<&str>) -> SubmissionUpsert {
    SubmissionUpsert {
        task_id,
        student_id,
        submission_text: text.map(str::to_string),
        files: files.iter().map(|id| file_ref(id)).collect(),
        submitted_at: Utc::now(),
    }
}

fn grade(graded_by: i64, value: f64) -> GradeUpdate {
    GradeUpdate {
        grade: value,
        feedback: None,
        teacher_comments: None,
        graded_by,
        graded_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_user_roundtrip() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    assert_eq!(storage.count_users().await.unwrap(), 0);

    let created = user(&storage, "alice", UserRole::Student, Some("CS"), Some(1)).await;
    let fetched = storage
        .get_user_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.role, UserRole::Student);
    assert_eq!(fetched.department.as_deref(), Some("CS"));
    assert_eq!(storage.count_users().await.unwrap(), 1);
    assert!(storage.get_user_by_id(999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_task_scope_roundtrip_and_student_listing() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, Some("cs"), Some(2)).await;
    let bob = user(&storage, "bob", UserRole::Student, Some("Math"), Some(3)).await;

    let direct = task(
        &storage,
        teacher.id,
        AssignmentScope::Individual {
            assignee_id: alice.id,
        },
    )
    .await;
    let by_dept = task(
        &storage,
        teacher.id,
        AssignmentScope::Department {
            target_department: "CS".to_string(),
        },
    )
    .await;
    let by_year = task(&storage, teacher.id, AssignmentScope::Year { target_year: 3 }).await;

    let fetched = storage.get_task_by_id(by_dept.id).await.unwrap().unwrap();
    assert_eq!(fetched.scope, by_dept.scope);
    assert_eq!(fetched.allowed_file_types, ["pdf", "txt"]);

    let mut alice_tasks: Vec<i64> = storage
        .list_tasks_for_student(&alice)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    alice_tasks.sort();
    assert_eq!(alice_tasks, [direct.id, by_dept.id]);

    let bob_tasks: Vec<i64> = storage
        .list_tasks_for_student(&bob)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(bob_tasks, [by_year.id]);

    assert_eq!(storage.list_tasks_by_owner(teacher.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_upsert_keeps_one_record_and_appends_files() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, None, None).await;
    let t = task(&storage, teacher.id, AssignmentScope::Year { target_year: 1 }).await;

    let first = storage
        .upsert_submission(upsert(t.id, alice.id, &["f1"], Some("hello")))
        .await
        .unwrap();
    let second = storage
        .upsert_submission(upsert(t.id, alice.id, &["f2", "f3"], None))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.submission_text.as_deref(), Some("hello"));
    let ids: Vec<_> = second.files.iter().map(|f| f.file_id.as_str()).collect();
    assert_eq!(ids, ["f1", "f2", "f3"]);
    assert_eq!(storage.list_submissions_by_task(t.id).await.unwrap().len(), 1);

    let (owner, file) = storage.find_submission_by_file_id("f2").await.unwrap().unwrap();
    assert_eq!(owner.id, first.id);
    assert_eq!(file.original_name, "f2.pdf");
}

#[tokio::test]
async fn test_graded_submission_is_guarded() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, None, None).await;
    let t = task(&storage, teacher.id, AssignmentScope::Year { target_year: 1 }).await;

    let s = storage
        .upsert_submission(upsert(t.id, alice.id, &["f1"], None))
        .await
        .unwrap();
    let graded = storage
        .grade_submission(s.id, grade(teacher.id, 77.5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(graded.status, SubmissionStatus::Graded);
    assert_eq!(graded.grade, Some(77.5));

    assert_eq!(
        storage.delete_submission_unless_graded(s.id).await.unwrap(),
        GuardedDelete::Graded
    );
    assert!(
        storage
            .upsert_submission(upsert(t.id, alice.id, &["f2"], None))
            .await
            .is_err()
    );
    // 被拒绝的重新提交不会留下附件
    assert!(storage.find_submission_by_file_id("f2").await.unwrap().is_none());

    let reopened = storage.reopen_submission(s.id).await.unwrap().unwrap();
    assert_eq!(reopened.status, SubmissionStatus::Returned);
    assert!(storage.reopen_submission(s.id).await.unwrap().is_none());

    match storage.delete_submission_unless_graded(s.id).await.unwrap() {
        GuardedDelete::Deleted(files) => assert_eq!(files.len(), 1),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(
        storage.delete_submission_unless_graded(s.id).await.unwrap(),
        GuardedDelete::Missing
    );
}

#[tokio::test]
async fn test_delete_racing_resubmission_leaves_no_unreferenced_files() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, None, None).await;
    let t = task(&storage, teacher.id, AssignmentScope::Year { target_year: 1 }).await;
    let s = storage
        .upsert_submission(upsert(t.id, alice.id, &["f1"], None))
        .await
        .unwrap();

    let (deleted, resubmitted) = tokio::join!(
        storage.delete_submission_unless_graded(s.id),
        storage.upsert_submission(upsert(t.id, alice.id, &["f2", "f3"], None)),
    );
    let returned: Vec<String> = match deleted.unwrap() {
        GuardedDelete::Deleted(files) => files.into_iter().map(|f| f.file_id).collect(),
        other => panic!("unexpected result: {other:?}"),
    };
    resubmitted.unwrap();

    // 每个附件要么交给调用方清理，要么仍属于某条提交
    for id in ["f1", "f2", "f3"] {
        let referenced = storage.find_submission_by_file_id(id).await.unwrap().is_some();
        let handed_back = returned.iter().any(|r| r == id);
        assert!(referenced ^ handed_back, "file {id}: referenced={referenced}");
    }
    assert!(returned.iter().any(|r| r == "f1"));
}

#[tokio::test]
async fn test_listings_are_newest_first_and_scoped_by_owner() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let t1_owner = user(&storage, "teach1", UserRole::Teacher, None, None).await;
    let t2_owner = user(&storage, "teach2", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, None, None).await;
    let t1 = task(&storage, t1_owner.id, AssignmentScope::Year { target_year: 1 }).await;
    let t2 = task(&storage, t2_owner.id, AssignmentScope::Year { target_year: 1 }).await;

    let mut older = upsert(t1.id, alice.id, &["a"], None);
    older.submitted_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut newer = upsert(t2.id, alice.id, &["b"], None);
    newer.submitted_at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    storage.upsert_submission(older).await.unwrap();
    storage.upsert_submission(newer).await.unwrap();

    let mine: Vec<i64> = storage
        .list_submissions_by_student(alice.id)
        .await
        .unwrap()
        .iter()
        .map(|s| s.task_id)
        .collect();
    assert_eq!(mine, [t2.id, t1.id]);

    let owned = storage
        .list_submissions_by_task_owner(t1_owner.id)
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].task_id, t1.id);
    assert_eq!(storage.list_all_submissions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_task_cascades() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, None, None).await;
    let bob = user(&storage, "bob", UserRole::Student, None, None).await;
    let t = task(&storage, teacher.id, AssignmentScope::Year { target_year: 1 }).await;

    storage
        .upsert_submission(upsert(t.id, alice.id, &["a1", "a2"], None))
        .await
        .unwrap();
    storage
        .upsert_submission(upsert(t.id, bob.id, &["b1"], None))
        .await
        .unwrap();

    let files = storage.delete_task(t.id).await.unwrap().unwrap();
    assert_eq!(files.len(), 3);
    assert!(storage.get_task_by_id(t.id).await.unwrap().is_none());
    assert!(storage.list_all_submissions().await.unwrap().is_empty());
    assert!(storage.delete_task(t.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_notifications_and_owner_flag() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, None, None).await;
    let t = task(&storage, teacher.id, AssignmentScope::Year { target_year: 1 }).await;
    let s = storage
        .upsert_submission(upsert(t.id, alice.id, &["f"], None))
        .await
        .unwrap();
    assert!(!s.notified_owner);

    assert!(storage.mark_owner_notified(s.id).await.unwrap());
    let s = storage.get_submission_by_id(s.id).await.unwrap().unwrap();
    assert!(s.notified_owner);

    // 重新提交会清除标记
    let s = storage
        .upsert_submission(upsert(t.id, alice.id, &[], Some("again")))
        .await
        .unwrap();
    assert!(!s.notified_owner);

    storage
        .create_notification(NewNotification {
            user_id: teacher.id,
            kind: NotificationKind::SubmissionReceived,
            title: "New Assignment Submission: Lab".to_string(),
            content: None,
            reference_id: Some(s.id),
        })
        .await
        .unwrap();
    let list = storage.list_notifications(teacher.id).await.unwrap();
    assert_eq!(list.len(), 1);
    assert!(!list[0].is_read);
    assert!(storage.list_notifications(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_task_update_and_reference_files() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    let teacher = user(&storage, "teach", UserRole::Teacher, None, None).await;
    let alice = user(&storage, "alice", UserRole::Student, Some("CS"), Some(1)).await;
    let t = task(
        &storage,
        teacher.id,
        AssignmentScope::Department {
            target_department: "CS".to_string(),
        },
    )
    .await;

    let mut changes = NewTask {
        owner_id: teacher.id,
        title: "Lab 2".to_string(),
        description: None,
        scope: AssignmentScope::Year { target_year: 1 },
        due_date: None,
        allowed_file_types: vec!["zip".to_string()],
        max_file_size: 10,
        submission_format: SubmissionFormat::File,
        status: TaskStatus::Closed,
    };
    let updated = storage.update_task(t.id, changes.clone()).await.unwrap().unwrap();
    assert_eq!(updated.title, "Lab 2");
    assert_eq!(updated.scope, AssignmentScope::Year { target_year: 1 });
    assert_eq!(updated.status, TaskStatus::Closed);
    // 旧的院系列已清空，关闭的任务不出现在学生列表中
    assert!(storage.list_tasks_for_student(&alice).await.unwrap().is_empty());

    changes.status = TaskStatus::Active;
    storage.update_task(t.id, changes.clone()).await.unwrap();
    assert_eq!(storage.list_tasks_for_student(&alice).await.unwrap().len(), 1);
    assert!(storage.update_task(999, changes).await.unwrap().is_none());

    let all = storage
        .add_task_files(t.id, vec![file_ref("r1"), file_ref("r2")])
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(storage.add_task_files(999, vec![file_ref("r3")]).await.is_err());

    storage
        .upsert_submission(upsert(t.id, alice.id, &["s1"], None))
        .await
        .unwrap();
    let mut removed: Vec<String> = storage
        .delete_task(t.id)
        .await
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|f| f.file_id)
        .collect();
    removed.sort();
    assert_eq!(removed, ["r1", "r2", "s1"]);
    assert!(storage.list_task_files(t.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_student_directory_filters() {
    let storage = SeaOrmStorage::open_in_memory().await.unwrap();
    user(&storage, "teach", UserRole::Teacher, Some("CS"), None).await;
    user(&storage, "bob", UserRole::Student, Some("cs "), Some(2)).await;
    user(&storage, "alice", UserRole::Student, Some("CS"), Some(1)).await;
    user(&storage, "carol", UserRole::Student, Some("Math"), Some(1)).await;

    let names = |users: Vec<User>| users.into_iter().map(|u| u.username).collect::<Vec<_>>();
    assert_eq!(
        names(storage.list_students(None, None).await.unwrap()),
        ["alice", "bob", "carol"]
    );
    assert_eq!(
        names(storage.list_students(Some("CS"), None).await.unwrap()),
        ["alice", "bob"]
    );
    assert_eq!(
        names(storage.list_students(None, Some(1)).await.unwrap()),
        ["alice", "carol"]
    );
    assert!(storage.list_students(Some("Physics"), None).await.unwrap().is_empty());
}
