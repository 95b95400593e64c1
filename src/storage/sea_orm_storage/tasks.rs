//! 任务存储操作

use super::SeaOrmStorage;
use crate::entity::submission_files::{Column as SubmissionFileColumn, Entity as SubmissionFiles};
use crate::entity::submissions::{Column as SubmissionColumn, Entity as Submissions};
use crate::entity::task_files::{
    ActiveModel as TaskFileActiveModel, Column as TaskFileColumn, Entity as TaskFiles,
};
use crate::entity::tasks::{ActiveModel, Column, Entity as Tasks};
use crate::errors::{Result, TrackerError};
use crate::models::{
    files::entities::FileRef,
    tasks::{
        entities::{AssignmentScope, Task, TaskStatus},
        requests::NewTask,
    },
    users::entities::User,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// 分配范围拆成三列：指派对象、院系、年级
fn scope_columns(scope: &AssignmentScope) -> (Option<i64>, Option<String>, Option<i32>) {
    match scope {
        AssignmentScope::Individual { assignee_id } => (Some(*assignee_id), None, None),
        AssignmentScope::Department { target_department } => {
            (None, Some(target_department.clone()), None)
        }
        AssignmentScope::Year { target_year } => (None, None, Some(*target_year)),
    }
}

impl SeaOrmStorage {
    /// 创建任务
    pub async fn create_task_impl(&self, task: NewTask) -> Result<Task> {
        let now = chrono::Utc::now().timestamp();

        let (assignee_id, target_department, target_year) = scope_columns(&task.scope);

        let model = ActiveModel {
            owner_id: Set(task.owner_id),
            title: Set(task.title),
            description: Set(task.description),
            assignment_type: Set(task.scope.assignment_type().to_string()),
            assignee_id: Set(assignee_id),
            target_department: Set(target_department),
            target_year: Set(target_year),
            due_date: Set(task.due_date.map(|d| d.timestamp())),
            allowed_file_types: Set(serde_json::to_string(&task.allowed_file_types)?),
            max_file_size: Set(task.max_file_size),
            submission_format: Set(task.submission_format.to_string()),
            status: Set(task.status.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("创建任务失败: {e}")))?;

        result.into_task()
    }

    /// 通过 ID 获取任务
    pub async fn get_task_by_id_impl(&self, id: i64) -> Result<Option<Task>> {
        let result = Tasks::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询任务失败: {e}")))?;

        result.map(|m| m.into_task()).transpose()
    }

    /// 覆盖任务的可编辑字段
    ///
    /// 三个范围列一起写入，旧范围留下的列会被清空。
    pub async fn update_task_impl(&self, id: i64, task: NewTask) -> Result<Option<Task>> {
        let Some(existing) = Tasks::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询任务失败: {e}")))?
        else {
            return Ok(None);
        };

        let (assignee_id, target_department, target_year) = scope_columns(&task.scope);
        let mut model: ActiveModel = existing.into();
        model.title = Set(task.title);
        model.description = Set(task.description);
        model.assignment_type = Set(task.scope.assignment_type().to_string());
        model.assignee_id = Set(assignee_id);
        model.target_department = Set(target_department);
        model.target_year = Set(target_year);
        model.due_date = Set(task.due_date.map(|d| d.timestamp()));
        model.allowed_file_types = Set(serde_json::to_string(&task.allowed_file_types)?);
        model.max_file_size = Set(task.max_file_size);
        model.submission_format = Set(task.submission_format.to_string());
        model.status = Set(task.status.to_string());
        model.updated_at = Set(chrono::Utc::now().timestamp());

        let result = model
            .update(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("更新任务失败: {e}")))?;

        result.into_task().map(Some)
    }

    /// 列出教师创建的任务
    pub async fn list_tasks_by_owner_impl(&self, owner_id: i64) -> Result<Vec<Task>> {
        let models = Tasks::find()
            .filter(Column::OwnerId.eq(owner_id))
            .order_by_desc(Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询任务列表失败: {e}")))?;

        models.into_iter().map(|m| m.into_task()).collect()
    }

    /// 列出分配给学生的有效任务
    ///
    /// 院系在数据库中做粗筛，大小写不敏感的精确匹配在内存中完成。
    pub async fn list_tasks_for_student_impl(&self, student: &User) -> Result<Vec<Task>> {
        let mut scope = Condition::any().add(Column::AssigneeId.eq(student.id));
        if student.department.is_some() {
            scope = scope.add(Column::TargetDepartment.is_not_null());
        }
        if let Some(year) = student.year {
            scope = scope.add(Column::TargetYear.eq(year));
        }

        let models = Tasks::find()
            .filter(Column::Status.eq(TaskStatus::Active.to_string()))
            .filter(scope)
            .order_by_desc(Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询任务列表失败: {e}")))?;

        let tasks = models
            .into_iter()
            .map(|m| m.into_task())
            .collect::<Result<Vec<_>>>()?;

        Ok(tasks
            .into_iter()
            .filter(|t| crate::policy::is_assignee_of(student, t))
            .collect())
    }

    /// 删除任务及其全部提交，返回需要清理的附件与参考资料
    pub async fn delete_task_impl(&self, id: i64) -> Result<Option<Vec<FileRef>>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| TrackerError::database_operation(format!("开启事务失败: {e}")))?;

        let Some(task) = Tasks::find_by_id(id)
            .one(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询任务失败: {e}")))?
        else {
            return Ok(None);
        };

        let submission_ids: Vec<i64> = Submissions::find()
            .filter(SubmissionColumn::TaskId.eq(task.id))
            .all(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交失败: {e}")))?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let mut files: Vec<FileRef> = if submission_ids.is_empty() {
            Vec::new()
        } else {
            let rows = SubmissionFiles::find()
                .filter(SubmissionFileColumn::SubmissionId.is_in(submission_ids.clone()))
                .all(&txn)
                .await
                .map_err(|e| TrackerError::database_operation(format!("查询附件失败: {e}")))?;

            SubmissionFiles::delete_many()
                .filter(SubmissionFileColumn::SubmissionId.is_in(submission_ids))
                .exec(&txn)
                .await
                .map_err(|e| TrackerError::database_operation(format!("删除附件失败: {e}")))?;

            rows.into_iter().map(|r| r.into_file_ref()).collect()
        };

        files.extend(Self::task_files_in(&txn, task.id).await?);
        TaskFiles::delete_many()
            .filter(TaskFileColumn::TaskId.eq(task.id))
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("删除参考资料失败: {e}")))?;

        Submissions::delete_many()
            .filter(SubmissionColumn::TaskId.eq(task.id))
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("删除提交失败: {e}")))?;

        Tasks::delete_by_id(task.id)
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("删除任务失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| TrackerError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(Some(files))
    }

    async fn task_files_in<C: ConnectionTrait>(conn: &C, task_id: i64) -> Result<Vec<FileRef>> {
        let rows = TaskFiles::find()
            .filter(TaskFileColumn::TaskId.eq(task_id))
            .order_by_asc(TaskFileColumn::Id)
            .all(conn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询参考资料失败: {e}")))?;

        Ok(rows.into_iter().map(|r| r.into_file_ref()).collect())
    }

    /// 追加参考资料
    pub async fn add_task_files_impl(
        &self,
        task_id: i64,
        files: Vec<FileRef>,
    ) -> Result<Vec<FileRef>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| TrackerError::database_operation(format!("开启事务失败: {e}")))?;

        if Tasks::find_by_id(task_id)
            .one(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询任务失败: {e}")))?
            .is_none()
        {
            return Err(TrackerError::not_found(format!("task {task_id} not found")));
        }

        for file in files {
            TaskFileActiveModel {
                task_id: Set(task_id),
                file_id: Set(file.file_id),
                original_name: Set(file.original_name),
                size_bytes: Set(file.size_bytes),
                content_type: Set(file.content_type),
                uploaded_at: Set(file.uploaded_at.timestamp()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("写入参考资料失败: {e}")))?;
        }

        let all = Self::task_files_in(&txn, task_id).await?;

        txn.commit()
            .await
            .map_err(|e| TrackerError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(all)
    }

    /// 任务的参考资料
    pub async fn list_task_files_impl(&self, task_id: i64) -> Result<Vec<FileRef>> {
        Self::task_files_in(&self.db, task_id).await
    }
}
