use super::SubmissionService;
use crate::blob_store::BlobObject;
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::FileRef;
use crate::policy;

/// 定位附件所属的提交，校验读取权限后打开文件流
pub async fn open_file(
    service: &SubmissionService,
    file_id: &str,
    acting_user_id: i64,
) -> Result<(FileRef, BlobObject)> {
    let (submission, file) = service
        .storage
        .find_submission_by_file_id(file_id)
        .await?
        .ok_or_else(|| TrackerError::not_found(format!("file {file_id} not found")))?;
    let task = service.load_task(submission.task_id).await?;

    if !policy::can_read_submission(acting_user_id, &task, &submission) {
        return Err(TrackerError::forbidden("Access denied"));
    }

    let blob = service.blobs.retrieve(&file.file_id).await?;
    Ok((file, blob))
}
