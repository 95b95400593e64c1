use super::TaskService;
use crate::errors::{Result, TrackerError};
use crate::models::tasks::entities::Task;
use crate::models::users::entities::User;
use crate::policy;

pub async fn get_task(service: &TaskService, user: &User, task_id: i64) -> Result<Task> {
    let task = service.load_task(task_id).await?;

    if !policy::can_view_task(user, &task) {
        return Err(TrackerError::forbidden("You are not assigned to this task"));
    }

    Ok(task)
}
