use tracing::info;

use super::SubmissionService;
use crate::errors::{Result, TrackerError};
use crate::models::submissions::entities::Submission;
use crate::policy;

/// 任务所有者将已评分的提交退回（graded -> returned）
pub async fn reopen(
    service: &SubmissionService,
    submission_id: i64,
    acting_user_id: i64,
) -> Result<Submission> {
    let submission = service.load_submission(submission_id).await?;
    let task = service.load_task(submission.task_id).await?;

    if !policy::is_task_owner(acting_user_id, &task) {
        return Err(TrackerError::forbidden(
            "Only the task owner can reopen this submission",
        ));
    }

    let reopened = service
        .storage
        .reopen_submission(submission_id)
        .await?
        .ok_or_else(|| TrackerError::invalid_operation("Only graded submissions can be reopened"))?;

    info!(
        "Submission {} reopened by user {}",
        submission_id, acting_user_id
    );

    Ok(reopened)
}
