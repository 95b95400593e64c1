use std::collections::HashMap;

use super::SubmissionService;
use crate::errors::{Result, TrackerError};
use crate::models::submissions::entities::Submission;
use crate::models::submissions::responses::SubmissionWithLateness;
use crate::models::tasks::entities::Task;
use crate::models::users::entities::{User, UserRole};
use crate::policy;

/// 任务所有者查看某任务的全部提交
pub async fn list_by_task(
    service: &SubmissionService,
    task_id: i64,
    acting_user_id: i64,
) -> Result<Vec<SubmissionWithLateness>> {
    let task = service.load_task(task_id).await?;

    if !policy::is_task_owner(acting_user_id, &task) {
        return Err(TrackerError::forbidden(
            "Only the task owner can list its submissions",
        ));
    }

    let submissions = service.storage.list_submissions_by_task(task_id).await?;
    Ok(submissions
        .into_iter()
        .map(|submission| {
            let is_late = task.is_late_at(submission.submitted_at);
            SubmissionWithLateness {
                submission,
                is_late,
            }
        })
        .collect())
}

pub async fn list_by_student(
    service: &SubmissionService,
    student_id: i64,
) -> Result<Vec<SubmissionWithLateness>> {
    let submissions = service.storage.list_submissions_by_student(student_id).await?;
    with_lateness(service, submissions).await
}

/// 管理员看到全部；教师看到自己任务下的全部
pub async fn list_all(
    service: &SubmissionService,
    acting_user: &User,
) -> Result<Vec<SubmissionWithLateness>> {
    let submissions = match acting_user.role {
        UserRole::Admin => service.storage.list_all_submissions().await?,
        UserRole::Teacher => {
            service
                .storage
                .list_submissions_by_task_owner(acting_user.id)
                .await?
        }
        UserRole::Student => {
            return Err(TrackerError::forbidden(
                "Only teachers and admins can list all submissions",
            ));
        }
    };
    with_lateness(service, submissions).await
}

/// 为跨任务的列表补上迟交标记，每个任务只查询一次
async fn with_lateness(
    service: &SubmissionService,
    submissions: Vec<Submission>,
) -> Result<Vec<SubmissionWithLateness>> {
    let mut tasks: HashMap<i64, Option<Task>> = HashMap::new();
    let mut items = Vec::with_capacity(submissions.len());

    for submission in submissions {
        if !tasks.contains_key(&submission.task_id) {
            let task = service.storage.get_task_by_id(submission.task_id).await?;
            tasks.insert(submission.task_id, task);
        }
        let is_late = tasks
            .get(&submission.task_id)
            .and_then(Option::as_ref)
            .is_some_and(|task| task.is_late_at(submission.submitted_at));
        items.push(SubmissionWithLateness {
            submission,
            is_late,
        });
    }

    Ok(items)
}
