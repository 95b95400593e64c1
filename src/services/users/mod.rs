//! 学生名录
//!
//! 教师按院系、年级浏览学生账号，用于挑选直接指派的对象。

pub mod list;

use std::sync::Arc;

use crate::errors::Result;
use crate::models::users::{entities::User, requests::StudentListQuery};
use crate::storage::Storage;

pub struct UserService {
    storage: Arc<dyn Storage>,
}

impl UserService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 学生列表，按用户名排序
    pub async fn list_students(&self, query: &StudentListQuery) -> Result<Vec<User>> {
        list::list_students(self, query).await
    }
}
