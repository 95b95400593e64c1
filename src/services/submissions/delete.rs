use tracing::info;

use super::SubmissionService;
use crate::errors::{Result, TrackerError};
use crate::policy;
use crate::storage::GuardedDelete;

/// 学生撤回未评分的提交，并尽力删除全部附件
pub async fn delete_submission(
    service: &SubmissionService,
    submission_id: i64,
    acting_user_id: i64,
) -> Result<()> {
    let submission = service.load_submission(submission_id).await?;

    if !policy::is_submission_owner(acting_user_id, &submission) {
        return Err(TrackerError::forbidden(
            "Only the submitting student can delete this submission",
        ));
    }

    // 状态判断与删除在同一条语句中完成，和并发的评分互不覆盖
    match service
        .storage
        .delete_submission_unless_graded(submission_id)
        .await?
    {
        GuardedDelete::Deleted(files) => {
            service.delete_blobs_best_effort(&files).await;
            info!(
                "Submission {} deleted by student {} ({} file(s))",
                submission_id,
                acting_user_id,
                files.len()
            );
            Ok(())
        }
        GuardedDelete::Graded => Err(TrackerError::invalid_operation(
            "Cannot delete graded submission",
        )),
        GuardedDelete::Missing => Err(TrackerError::not_found(format!(
            "submission {submission_id} not found"
        ))),
    }
}
