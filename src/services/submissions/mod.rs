//! 提交与评分
//!
//! 负责提交的整个生命周期：按任务规则校验、上传附件、按 (任务, 学生) 写入、
//! 评分、退回、删除以及附件下载。每个操作都先经过 `policy` 判断权限。

pub mod delete;
pub mod detail;
pub mod download;
pub mod grade;
pub mod list;
pub mod reopen;
pub mod submit;
pub mod upload;


use std::sync::Arc;
use std::time::Duration;

use crate::blob_store::{BlobObject, BlobStore};
use crate::config::UploadConfig;
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::{FileRef, UploadedFile};
use crate::models::submissions::entities::Submission;
use crate::models::submissions::requests::GradeSubmissionRequest;
use crate::models::submissions::responses::SubmissionWithLateness;
use crate::models::tasks::entities::Task;
use crate::models::users::entities::User;
use crate::notifier::NotifierHandle;
use crate::storage::Storage;
use crate::utils::Clock;

/// 上传相关的限制
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// 单次提交最多文件数
    pub max_files: usize,
    /// 单文件硬上限，任务自身的限制另行校验
    pub max_size: usize,
    pub io_timeout: Duration,
    pub store_retries: u32,
}

impl From<&UploadConfig> for UploadSettings {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_size: config.max_size,
            io_timeout: Duration::from_millis(config.io_timeout_ms),
            store_retries: config.store_retries,
        }
    }
}

pub struct SubmissionService {
    storage: Arc<dyn Storage>,
    blobs: Arc<dyn BlobStore>,
    notifier: NotifierHandle,
    clock: Arc<dyn Clock>,
    settings: UploadSettings,
}

impl SubmissionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        blobs: Arc<dyn BlobStore>,
        notifier: NotifierHandle,
        clock: Arc<dyn Clock>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            storage,
            blobs,
            notifier,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// 提交作业，返回持久化后的提交及是否迟交
    pub async fn submit(
        &self,
        task_id: i64,
        student_id: i64,
        files: Vec<UploadedFile>,
        submission_text: Option<String>,
    ) -> Result<(Submission, bool)> {
        submit::submit(self, task_id, student_id, files, submission_text).await
    }

    /// 评分
    pub async fn grade(
        &self,
        submission_id: i64,
        req: GradeSubmissionRequest,
        acting_user_id: i64,
    ) -> Result<Submission> {
        grade::grade(self, submission_id, req, acting_user_id).await
    }

    /// 学生删除自己未评分的提交
    pub async fn delete_submission(&self, submission_id: i64, acting_user_id: i64) -> Result<()> {
        delete::delete_submission(self, submission_id, acting_user_id).await
    }

    /// 任务所有者查看某任务的全部提交
    pub async fn list_by_task(
        &self,
        task_id: i64,
        acting_user_id: i64,
    ) -> Result<Vec<SubmissionWithLateness>> {
        list::list_by_task(self, task_id, acting_user_id).await
    }

    /// 学生自己的提交
    pub async fn list_by_student(&self, student_id: i64) -> Result<Vec<SubmissionWithLateness>> {
        list::list_by_student(self, student_id).await
    }

    /// 管理员查看全部，教师查看自己任务下的全部
    pub async fn list_all(&self, acting_user: &User) -> Result<Vec<SubmissionWithLateness>> {
        list::list_all(self, acting_user).await
    }

    /// 任务所有者或提交学生查看提交详情
    pub async fn get_by_id(
        &self,
        submission_id: i64,
        acting_user_id: i64,
    ) -> Result<SubmissionWithLateness> {
        detail::get_by_id(self, submission_id, acting_user_id).await
    }

    /// 将已评分的提交退回，允许学生重新提交
    pub async fn reopen(&self, submission_id: i64, acting_user_id: i64) -> Result<Submission> {
        reopen::reopen(self, submission_id, acting_user_id).await
    }

    /// 打开附件
    pub async fn open_file(
        &self,
        file_id: &str,
        acting_user_id: i64,
    ) -> Result<(FileRef, BlobObject)> {
        download::open_file(self, file_id, acting_user_id).await
    }

    pub(crate) async fn load_task(&self, task_id: i64) -> Result<Task> {
        self.storage
            .get_task_by_id(task_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("task {task_id} not found")))
    }

    pub(crate) async fn load_submission(&self, submission_id: i64) -> Result<Submission> {
        self.storage
            .get_submission_by_id(submission_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("submission {submission_id} not found")))
    }

    /// 批量删除附件，失败只记录日志
    pub(crate) async fn delete_blobs_best_effort(&self, files: &[FileRef]) {
        for file in files {
            if let Err(e) = self.blobs.delete(&file.file_id).await {
                tracing::warn!(
                    "{}",
                    TrackerError::partial_failure(format!(
                        "failed to delete blob {}: {e}",
                        file.file_id
                    ))
                );
            }
        }
    }
}
