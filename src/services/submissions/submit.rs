use tracing::info;

use super::SubmissionService;
use super::upload::store_with_retry;
use crate::blob_store::BlobMetadata;
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::{FileRef, UploadedFile};
use crate::models::submissions::entities::Submission;
use crate::models::tasks::entities::{Task, TaskStatus};
use crate::notifier::SubmissionEvent;
use crate::policy;
use crate::storage::SubmissionUpsert;
use crate::utils::{MagicCheck, sniff_magic_bytes};

pub async fn submit(
    service: &SubmissionService,
    task_id: i64,
    student_id: i64,
    files: Vec<UploadedFile>,
    submission_text: Option<String>,
) -> Result<(Submission, bool)> {
    let task = service.load_task(task_id).await?;
    let student = service
        .storage
        .get_user_by_id(student_id)
        .await?
        .ok_or_else(|| TrackerError::not_found(format!("user {student_id} not found")))?;

    if !policy::is_assignee_of(&student, &task) {
        return Err(TrackerError::forbidden("You are not assigned to this task"));
    }

    if task.status != TaskStatus::Active {
        return Err(TrackerError::invalid_operation(format!(
            "task is {} and does not accept submissions",
            task.status
        )));
    }

    // 空白文本视为未提供
    let text = submission_text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    validate_submission(service, &task, &files, text.as_deref())?;

    // 已评分的提交在写入附件前就拒绝，避免产生孤儿文件
    if let Some(existing) = service.storage.find_submission(task_id, student_id).await?
        && existing.is_graded()
    {
        return Err(TrackerError::invalid_operation(
            "submission has been graded; ask the task owner to reopen it before resubmitting",
        ));
    }

    let submitted_at = service.clock.now();
    let stored = store_files(service, &task, student_id, files, submitted_at).await?;

    let upsert = SubmissionUpsert {
        task_id,
        student_id,
        submission_text: text,
        files: stored.clone(),
        submitted_at,
    };

    let submission = match service.storage.upsert_submission(upsert).await {
        Ok(submission) => submission,
        Err(e) => {
            service.delete_blobs_best_effort(&stored).await;
            return Err(e);
        }
    };

    let is_late = task.is_late_at(submission.submitted_at);

    info!(
        "Student {} submitted task {} (submission {}, {} new file(s), late: {})",
        student_id,
        task_id,
        submission.id,
        stored.len(),
        is_late
    );

    service.notifier.dispatch(SubmissionEvent {
        submission_id: submission.id,
        task_id,
        task_title: task.title.clone(),
        owner_id: task.owner_id,
        student_id,
        student_name: student
            .display_name
            .clone()
            .unwrap_or_else(|| student.username.clone()),
        is_late,
        files: stored,
        submitted_at: submission.submitted_at,
    });

    Ok((submission, is_late))
}

/// 按任务规则校验整批文件，任何一个不合格则整批拒绝
fn validate_submission(
    service: &SubmissionService,
    task: &Task,
    files: &[UploadedFile],
    text: Option<&str>,
) -> Result<()> {
    if files.is_empty() && text.is_none() {
        return Err(TrackerError::invalid_argument(
            "Please upload at least one file or provide submission text",
        ));
    }

    if !files.is_empty() && !task.submission_format.accepts_files() {
        return Err(TrackerError::invalid_argument(
            "This task only accepts text submissions",
        ));
    }

    if files.is_empty() && !task.submission_format.accepts_text_only() {
        return Err(TrackerError::invalid_argument(
            "This task requires at least one file",
        ));
    }

    let max_files = service.settings.max_files;
    if files.len() > max_files {
        return Err(TrackerError::invalid_argument(format!(
            "At most {max_files} files can be submitted at once"
        )));
    }

    let max_size = (task.max_file_size.max(0) as u64).min(service.settings.max_size as u64);

    for file in files {
        let ext = file.extension().ok_or_else(|| {
            TrackerError::invalid_argument(format!(
                "File '{}' has no extension",
                file.original_name
            ))
        })?;

        if !task.allows_extension(&ext) {
            return Err(TrackerError::invalid_argument(format!(
                "File type .{ext} is not allowed. Allowed types: {}",
                task.allowed_file_types.join(", ")
            )));
        }

        if file.size() as u64 > max_size {
            return Err(TrackerError::invalid_argument(format!(
                "File '{}' exceeds the maximum size of {max_size} bytes",
                file.original_name
            )));
        }

        if sniff_magic_bytes(&file.data, &ext) == MagicCheck::Mismatch {
            return Err(TrackerError::invalid_argument(format!(
                "Content of '{}' does not match its .{ext} extension",
                file.original_name
            )));
        }
    }

    Ok(())
}

/// 依次存储文件；某个文件最终失败时清理已存储的部分
async fn store_files(
    service: &SubmissionService,
    task: &Task,
    student_id: i64,
    files: Vec<UploadedFile>,
    uploaded_at: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<FileRef>> {
    let mut stored = Vec::with_capacity(files.len());

    for file in files {
        let mut metadata = BlobMetadata::new();
        metadata.insert("task_id".to_string(), task.id.to_string());
        metadata.insert("student_id".to_string(), student_id.to_string());
        metadata.insert("uploaded_at".to_string(), uploaded_at.to_rfc3339());
        metadata.insert("original_name".to_string(), file.original_name.clone());
        metadata.insert("content_type".to_string(), file.content_type.clone());

        let outcome =
            store_with_retry(service.blobs.as_ref(), &service.settings, &file, metadata).await;
        match outcome {
            Ok(file_id) => stored.push(FileRef {
                file_id,
                size_bytes: file.size() as i64,
                original_name: file.original_name,
                content_type: file.content_type,
                uploaded_at,
            }),
            Err(e) => {
                service.delete_blobs_best_effort(&stored).await;
                return Err(e);
            }
        }
    }

    Ok(stored)
}
