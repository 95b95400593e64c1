//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod notifications;
mod submissions;
mod tasks;
mod users;

#[cfg(test)]
mod tests;

use crate::config::DatabaseConfig;
use crate::errors::{Result, TrackerError};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async(config: &DatabaseConfig) -> Result<Self> {
        let db_url = Self::build_database_url(&config.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        Self::migrate(&db).await?;

        info!("SeaORM storage initialized, database: {}", Self::redact_url(&db_url));

        Ok(Self { db })
    }

    /// 内存 SQLite，仅用于测试
    ///
    /// 单连接且永不回收，否则每个新连接都会得到一个空库。
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| TrackerError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opt)
            .await
            .map_err(|e| TrackerError::database_connection(format!("SQLite 连接失败: {e}")))?;

        let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
        Self::migrate(&db).await?;
        Ok(Self { db })
    }

    async fn migrate(db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None)
            .await
            .map_err(|e| TrackerError::database_operation(format!("数据库迁移失败: {e}")))
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| TrackerError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| TrackerError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.pool_size)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.timeout))
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| TrackerError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(TrackerError::database_config(format!(
                "无法从 URL 推断数据库类型. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径 (got scheme '{}')",
                url.split("://").next().unwrap_or_default()
            )))
        }
    }

    /// 日志中隐藏连接串里的口令
    fn redact_url(url: &str) -> String {
        match (url.find("://"), url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &url[..scheme_end], &url[at..])
            }
            _ => url.to_string(),
        }
    }
}

// Storage trait 实现
use crate::models::{
    files::entities::FileRef,
    notifications::entities::{NewNotification, Notification},
    submissions::entities::Submission,
    tasks::{entities::Task, requests::NewTask},
    users::{entities::User, requests::CreateUserRequest},
};
use crate::storage::{GradeUpdate, GuardedDelete, Storage, SubmissionUpsert};
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    async fn list_students(
        &self,
        department: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<User>> {
        self.list_students_impl(department, year).await
    }

    // 任务模块
    async fn create_task(&self, task: NewTask) -> Result<Task> {
        self.create_task_impl(task).await
    }

    async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>> {
        self.get_task_by_id_impl(id).await
    }

    async fn list_tasks_by_owner(&self, owner_id: i64) -> Result<Vec<Task>> {
        self.list_tasks_by_owner_impl(owner_id).await
    }

    async fn list_tasks_for_student(&self, student: &User) -> Result<Vec<Task>> {
        self.list_tasks_for_student_impl(student).await
    }

    async fn update_task(&self, id: i64, task: NewTask) -> Result<Option<Task>> {
        self.update_task_impl(id, task).await
    }

    async fn delete_task(&self, id: i64) -> Result<Option<Vec<FileRef>>> {
        self.delete_task_impl(id).await
    }

    async fn add_task_files(&self, task_id: i64, files: Vec<FileRef>) -> Result<Vec<FileRef>> {
        self.add_task_files_impl(task_id, files).await
    }

    async fn list_task_files(&self, task_id: i64) -> Result<Vec<FileRef>> {
        self.list_task_files_impl(task_id).await
    }

    // 提交模块
    async fn find_submission(
        &self,
        task_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        self.find_submission_impl(task_id, student_id).await
    }

    async fn upsert_submission(&self, upsert: SubmissionUpsert) -> Result<Submission> {
        self.upsert_submission_impl(upsert).await
    }

    async fn get_submission_by_id(&self, id: i64) -> Result<Option<Submission>> {
        self.get_submission_by_id_impl(id).await
    }

    async fn find_submission_by_file_id(
        &self,
        file_id: &str,
    ) -> Result<Option<(Submission, FileRef)>> {
        self.find_submission_by_file_id_impl(file_id).await
    }

    async fn list_submissions_by_task(&self, task_id: i64) -> Result<Vec<Submission>> {
        self.list_submissions_by_task_impl(task_id).await
    }

    async fn list_submissions_by_student(&self, student_id: i64) -> Result<Vec<Submission>> {
        self.list_submissions_by_student_impl(student_id).await
    }

    async fn list_submissions_by_task_owner(&self, owner_id: i64) -> Result<Vec<Submission>> {
        self.list_submissions_by_task_owner_impl(owner_id).await
    }

    async fn list_all_submissions(&self) -> Result<Vec<Submission>> {
        self.list_all_submissions_impl().await
    }

    async fn grade_submission(&self, id: i64, update: GradeUpdate) -> Result<Option<Submission>> {
        self.grade_submission_impl(id, update).await
    }

    async fn reopen_submission(&self, id: i64) -> Result<Option<Submission>> {
        self.reopen_submission_impl(id).await
    }

    async fn delete_submission_unless_graded(&self, id: i64) -> Result<GuardedDelete> {
        self.delete_submission_unless_graded_impl(id).await
    }

    async fn mark_owner_notified(&self, id: i64) -> Result<bool> {
        self.mark_owner_notified_impl(id).await
    }

    // 通知模块
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        self.create_notification_impl(notification).await
    }

    async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>> {
        self.list_notifications_impl(user_id).await
    }
}
