use tracing::info;

use super::TaskService;
use crate::blob_store::{BlobMetadata, BlobObject};
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::{FileRef, UploadedFile};
use crate::models::users::entities::User;
use crate::policy;
use crate::services::submissions::upload::store_with_retry;
use crate::utils::{MagicCheck, sniff_magic_bytes};

/// 附加参考资料，任务的参考资料总数不超过 `upload.max_files`
pub async fn attach_references(
    service: &TaskService,
    user: &User,
    task_id: i64,
    files: Vec<UploadedFile>,
) -> Result<Vec<FileRef>> {
    let task = service.load_task(task_id).await?;

    if !policy::is_task_owner(user.id, &task) {
        return Err(TrackerError::forbidden(
            "Only the task owner can attach reference files",
        ));
    }

    let existing = service.storage.list_task_files(task_id).await?;
    let max_files = service.settings.max_files;
    if existing.len() + files.len() > max_files {
        return Err(TrackerError::invalid_argument(format!(
            "A task can carry at most {max_files} reference files"
        )));
    }

    for file in &files {
        if file.size() > service.settings.max_size {
            return Err(TrackerError::invalid_argument(format!(
                "File '{}' exceeds the maximum size of {} bytes",
                file.original_name, service.settings.max_size
            )));
        }
        if let Some(ext) = file.extension()
            && sniff_magic_bytes(&file.data, &ext) == MagicCheck::Mismatch
        {
            return Err(TrackerError::invalid_argument(format!(
                "Content of '{}' does not match its .{ext} extension",
                file.original_name
            )));
        }
    }

    let uploaded_at = chrono::Utc::now();
    let mut stored = Vec::with_capacity(files.len());
    for file in files {
        let mut metadata = BlobMetadata::new();
        metadata.insert("task_id".to_string(), task_id.to_string());
        metadata.insert("owner_id".to_string(), user.id.to_string());
        metadata.insert("kind".to_string(), "reference".to_string());
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
                service.delete_blobs_best_effort(task_id, &stored).await;
                return Err(e);
            }
        }
    }

    let all = match service.storage.add_task_files(task_id, stored.clone()).await {
        Ok(all) => all,
        Err(e) => {
            service.delete_blobs_best_effort(task_id, &stored).await;
            return Err(e);
        }
    };

    info!(
        "User {} attached {} reference file(s) to task {}",
        user.id,
        stored.len(),
        task_id
    );
    Ok(all)
}

/// 能查看任务的人都能看到参考资料
pub async fn list_references(
    service: &TaskService,
    user: &User,
    task_id: i64,
) -> Result<Vec<FileRef>> {
    let task = service.load_task(task_id).await?;
    if !policy::can_view_task(user, &task) {
        return Err(TrackerError::forbidden("You are not assigned to this task"));
    }
    service.storage.list_task_files(task_id).await
}

pub async fn open_reference(
    service: &TaskService,
    user: &User,
    task_id: i64,
    file_id: &str,
) -> Result<(FileRef, BlobObject)> {
    let file = list_references(service, user, task_id)
        .await?
        .into_iter()
        .find(|f| f.file_id == file_id)
        .ok_or_else(|| TrackerError::not_found(format!("file {file_id} not found")))?;

    let blob = service.blobs.retrieve(&file.file_id).await?;
    Ok((file, blob))
}
