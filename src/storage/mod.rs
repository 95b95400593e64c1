use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::models::{
    files::entities::FileRef,
    notifications::entities::{NewNotification, Notification},
    submissions::entities::Submission,
    tasks::{entities::Task, requests::NewTask},
    users::{entities::User, requests::CreateUserRequest},
};

use crate::errors::Result;

pub mod sea_orm_storage;

/// 一次提交要写入的内容
#[derive(Debug, Clone)]
pub struct SubmissionUpsert {
    pub task_id: i64,
    pub student_id: i64,
    /// 为 None 时保留原有文本
    pub submission_text: Option<String>,
    /// 追加到已有附件之后
    pub files: Vec<FileRef>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// 评分写入的内容
#[derive(Debug, Clone)]
pub struct GradeUpdate {
    pub grade: f64,
    /// 为 None 时保留原值
    pub feedback: Option<String>,
    /// 为 None 时保留原值
    pub teacher_comments: Option<String>,
    pub graded_by: i64,
    pub graded_at: chrono::DateTime<chrono::Utc>,
}

/// 带守卫的删除结果
#[derive(Debug, Clone, PartialEq)]
pub enum GuardedDelete {
    /// 已删除，返回原有附件
    Deleted(Vec<FileRef>),
    /// 记录已评分，未删除
    Graded,
    /// 记录不存在
    Missing,
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 用户总数
    async fn count_users(&self) -> Result<u64>;
    // 学生名录，可按院系（不区分大小写）和年级过滤
    async fn list_students(&self, department: Option<&str>, year: Option<i32>)
    -> Result<Vec<User>>;

    /// 任务管理方法
    // 创建任务
    async fn create_task(&self, task: NewTask) -> Result<Task>;
    // 通过ID获取任务
    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>>;
    // 列出某教师创建的任务
    async fn list_tasks_by_owner(&self, owner_id: i64) -> Result<Vec<Task>>;
    // 列出分配给某学生的有效任务（直接指派或院系/年级范围）
    async fn list_tasks_for_student(&self, student: &User) -> Result<Vec<Task>>;
    // 覆盖任务的可编辑字段，所有者不变；任务不存在时返回 None
    async fn update_task(&self, id: i64, task: NewTask) -> Result<Option<Task>>;
    // 删除任务，返回其提交附件与参考资料
    async fn delete_task(&self, id: i64) -> Result<Option<Vec<FileRef>>>;
    // 追加参考资料，返回任务当前的全部参考资料
    async fn add_task_files(&self, task_id: i64, files: Vec<FileRef>) -> Result<Vec<FileRef>>;
    // 任务的参考资料，按上传顺序
    async fn list_task_files(&self, task_id: i64) -> Result<Vec<FileRef>>;

    /// 提交管理方法
    // 按 (task_id, student_id) 查询
    async fn find_submission(&self, task_id: i64, student_id: i64)
    -> Result<Option<Submission>>;
    // 原子地创建或更新提交并追加附件；已评分时返回 InvalidOperation
    async fn upsert_submission(&self, upsert: SubmissionUpsert) -> Result<Submission>;
    // 通过ID获取提交
    async fn get_submission_by_id(&self, id: i64) -> Result<Option<Submission>>;
    // 通过附件的文件ID查找所属提交
    async fn find_submission_by_file_id(&self, file_id: &str)
    -> Result<Option<(Submission, FileRef)>>;
    // 某任务的全部提交
    async fn list_submissions_by_task(&self, task_id: i64) -> Result<Vec<Submission>>;
    // 某学生的全部提交
    async fn list_submissions_by_student(&self, student_id: i64) -> Result<Vec<Submission>>;
    // 某教师名下任务的全部提交
    async fn list_submissions_by_task_owner(&self, owner_id: i64) -> Result<Vec<Submission>>;
    // 全部提交
    async fn list_all_submissions(&self) -> Result<Vec<Submission>>;
    // 评分
    async fn grade_submission(&self, id: i64, update: GradeUpdate) -> Result<Option<Submission>>;
    // 将已评分的提交退回；非已评分状态返回 None
    async fn reopen_submission(&self, id: i64) -> Result<Option<Submission>>;
    // 删除未评分的提交
    async fn delete_submission_unless_graded(&self, id: i64) -> Result<GuardedDelete>;
    // 标记已通知任务所有者
    async fn mark_owner_notified(&self, id: i64) -> Result<bool>;

    /// 通知方法
    // 写入通知
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification>;
    // 列出用户的通知
    async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>>;
}

pub async fn create_storage(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async(config).await?;
    Ok(Arc::new(storage))
}
