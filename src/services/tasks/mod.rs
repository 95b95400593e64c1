//! 任务目录
//!
//! 教师创建和管理任务，学生按直接指派或院系/年级范围看到分配给自己的任务。
//! 任务所有者可以附加参考资料，能查看任务的人都可以下载。

pub mod create;
pub mod delete;
pub mod detail;
pub mod list;
pub mod references;
pub mod update;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::blob_store::{BlobObject, BlobStore};
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::{FileRef, UploadedFile};
use crate::models::tasks::{
    entities::Task,
    requests::{CreateTaskRequest, UpdateTaskRequest},
};
use crate::models::users::entities::User;
use crate::services::submissions::UploadSettings;
use crate::storage::Storage;

pub struct TaskService {
    storage: Arc<dyn Storage>,
    blobs: Arc<dyn BlobStore>,
    settings: UploadSettings,
}

impl TaskService {
    pub fn new(
        storage: Arc<dyn Storage>,
        blobs: Arc<dyn BlobStore>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            storage,
            blobs,
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// 创建任务
    pub async fn create(&self, owner: &User, req: CreateTaskRequest) -> Result<Task> {
        create::create_task(self, owner, req).await
    }

    /// 教师：自己创建的任务；学生：分配给自己的有效任务
    pub async fn list(&self, user: &User) -> Result<Vec<Task>> {
        list::list_tasks(self, user).await
    }

    /// 任务详情
    pub async fn get(&self, user: &User, task_id: i64) -> Result<Task> {
        detail::get_task(self, user, task_id).await
    }

    /// 所有者修改任务
    pub async fn update(&self, user: &User, task_id: i64, req: UpdateTaskRequest) -> Result<Task> {
        update::update_task(self, user, task_id, req).await
    }

    /// 删除任务及其全部提交
    pub async fn delete(&self, user: &User, task_id: i64) -> Result<()> {
        delete::delete_task(self, user, task_id).await
    }

    /// 所有者附加参考资料，返回任务当前的全部参考资料
    pub async fn attach_references(
        &self,
        user: &User,
        task_id: i64,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<FileRef>> {
        references::attach_references(self, user, task_id, files).await
    }

    /// 参考资料列表
    pub async fn list_references(&self, user: &User, task_id: i64) -> Result<Vec<FileRef>> {
        references::list_references(self, user, task_id).await
    }

    /// 打开参考资料
    pub async fn open_reference(
        &self,
        user: &User,
        task_id: i64,
        file_id: &str,
    ) -> Result<(FileRef, BlobObject)> {
        references::open_reference(self, user, task_id, file_id).await
    }

    pub(crate) async fn load_task(&self, task_id: i64) -> Result<Task> {
        self.storage
            .get_task_by_id(task_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("task {task_id} not found")))
    }

    /// 批量删除文件，失败只记录日志
    pub(crate) async fn delete_blobs_best_effort(&self, task_id: i64, files: &[FileRef]) {
        for file in files {
            if let Err(e) = self.blobs.delete(&file.file_id).await {
                tracing::warn!(
                    "{}",
                    TrackerError::partial_failure(format!(
                        "failed to delete blob {} of task {task_id}: {e}",
                        file.file_id
                    ))
                );
            }
        }
    }
}
