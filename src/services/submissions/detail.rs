use super::SubmissionService;
use crate::errors::{Result, TrackerError};
use crate::models::submissions::responses::SubmissionWithLateness;
use crate::policy;

pub async fn get_by_id(
    service: &SubmissionService,
    submission_id: i64,
    acting_user_id: i64,
) -> Result<SubmissionWithLateness> {
    let submission = service.load_submission(submission_id).await?;
    let task = service.load_task(submission.task_id).await?;

    if !policy::can_read_submission(acting_user_id, &task, &submission) {
        return Err(TrackerError::forbidden("Access denied"));
    }

    let is_late = task.is_late_at(submission.submitted_at);
    Ok(SubmissionWithLateness {
        submission,
        is_late,
    })
}
