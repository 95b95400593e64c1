use tracing::info;

use super::TaskService;
use super::create::ensure_assignable;
use crate::errors::{Result, TrackerError};
use crate::models::tasks::{entities::Task, requests::UpdateTaskRequest};
use crate::models::users::entities::User;
use crate::policy;

/// 修改任务；合并后的任务与创建时走同一套校验
pub async fn update_task(
    service: &TaskService,
    user: &User,
    task_id: i64,
    req: UpdateTaskRequest,
) -> Result<Task> {
    let task = service.load_task(task_id).await?;

    if !policy::is_task_owner(user.id, &task) {
        return Err(TrackerError::forbidden("Only the task owner can update this task"));
    }

    let changes = req.merge_into(&task)?.into_new_task(task.owner_id)?;
    if changes.scope != task.scope {
        ensure_assignable(service, &changes.scope).await?;
    }

    let updated = service
        .storage
        .update_task(task_id, changes)
        .await?
        .ok_or_else(|| TrackerError::not_found(format!("task {task_id} not found")))?;

    info!(
        "Task {} updated by user {} (status: {})",
        task_id, user.id, updated.status
    );
    Ok(updated)
}
