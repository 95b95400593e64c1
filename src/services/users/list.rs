use super::UserService;
use crate::errors::Result;
use crate::models::users::{entities::User, requests::StudentListQuery};

pub async fn list_students(service: &UserService, query: &StudentListQuery) -> Result<Vec<User>> {
    service
        .storage
        .list_students(query.department.as_deref(), query.year)
        .await
}
