use tracing::info;

use super::TaskService;
use crate::errors::{Result, TrackerError};
use crate::models::tasks::entities::{AssignmentScope, Task};
use crate::models::tasks::requests::CreateTaskRequest;
use crate::models::users::entities::{User, UserRole};

pub async fn create_task(service: &TaskService, owner: &User, req: CreateTaskRequest) -> Result<Task> {
    if owner.role == UserRole::Student {
        return Err(TrackerError::forbidden("Only teachers can create tasks"));
    }

    let new_task = req.into_new_task(owner.id)?;

    ensure_assignable(service, &new_task.scope).await?;

    let task = service.storage.create_task(new_task).await?;
    info!(
        "Task {} created by user {} ({})",
        task.id,
        owner.id,
        task.scope.assignment_type()
    );
    Ok(task)
}

/// 直接指派的对象必须是已存在的学生
pub(super) async fn ensure_assignable(service: &TaskService, scope: &AssignmentScope) -> Result<()> {
    if let AssignmentScope::Individual { assignee_id } = *scope {
        let assignee = service.storage.get_user_by_id(assignee_id).await?;
        if !assignee.is_some_and(|u| u.role == UserRole::Student) {
            return Err(TrackerError::invalid_argument(format!(
                "assignee {assignee_id} is not a student"
            )));
        }
    }
    Ok(())
}
