use super::TaskService;
use crate::errors::Result;
use crate::models::tasks::entities::Task;
use crate::models::users::entities::{User, UserRole};

pub async fn list_tasks(service: &TaskService, user: &User) -> Result<Vec<Task>> {
    match user.role {
        UserRole::Student => service.storage.list_tasks_for_student(user).await,
        UserRole::Teacher | UserRole::Admin => service.storage.list_tasks_by_owner(user.id).await,
    }
}
