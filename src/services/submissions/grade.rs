use tracing::info;

use super::SubmissionService;
use crate::errors::{Result, TrackerError};
use crate::models::submissions::entities::{MAX_GRADE, MIN_GRADE, Submission};
use crate::models::submissions::requests::GradeSubmissionRequest;
use crate::policy;
use crate::storage::GradeUpdate;

/// 评分；重复评分会覆盖，未提供的评语保持原值
pub async fn grade(
    service: &SubmissionService,
    submission_id: i64,
    req: GradeSubmissionRequest,
    acting_user_id: i64,
) -> Result<Submission> {
    let submission = service.load_submission(submission_id).await?;
    let task = service.load_task(submission.task_id).await?;

    if !policy::is_task_owner(acting_user_id, &task) {
        return Err(TrackerError::forbidden(
            "Only the task owner can grade this submission",
        ));
    }

    // NaN 不满足区间比较，同样被拒绝
    if !(MIN_GRADE..=MAX_GRADE).contains(&req.grade) {
        return Err(TrackerError::invalid_argument(format!(
            "Grade must be between {MIN_GRADE} and {MAX_GRADE}"
        )));
    }

    let update = GradeUpdate {
        grade: req.grade,
        feedback: req.feedback,
        teacher_comments: req.teacher_comments,
        graded_by: acting_user_id,
        graded_at: service.clock.now(),
    };

    let graded = service
        .storage
        .grade_submission(submission_id, update)
        .await?
        .ok_or_else(|| TrackerError::not_found(format!("submission {submission_id} not found")))?;

    info!(
        "Submission {} graded {} by user {}",
        submission_id, req.grade, acting_user_id
    );

    Ok(graded)
}
