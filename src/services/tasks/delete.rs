use tracing::info;

use super::TaskService;
use crate::errors::{Result, TrackerError};
use crate::models::users::entities::User;
use crate::policy;

/// 删除任务，级联删除全部提交与参考资料；文件尽力删除
pub async fn delete_task(service: &TaskService, user: &User, task_id: i64) -> Result<()> {
    let task = service.load_task(task_id).await?;

    if !policy::is_task_owner(user.id, &task) {
        return Err(TrackerError::forbidden("Only the task owner can delete this task"));
    }

    let files = service
        .storage
        .delete_task(task_id)
        .await?
        .ok_or_else(|| TrackerError::not_found(format!("task {task_id} not found")))?;

    service.delete_blobs_best_effort(task_id, &files).await;

    info!(
        "Task {} deleted by user {} ({} file(s) removed)",
        task_id,
        user.id,
        files.len()
    );
    Ok(())
}
