//! 提交存储操作

use std::collections::HashMap;

use super::SeaOrmStorage;
use crate::entity::submission_files::{
    ActiveModel as SubmissionFileActiveModel, Column as SubmissionFileColumn,
    Entity as SubmissionFiles,
};
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions, Model};
use crate::entity::tasks::{Column as TaskColumn, Entity as Tasks};
use crate::errors::{Result, TrackerError};
use crate::models::{
    files::entities::FileRef,
    submissions::entities::{Submission, SubmissionStatus},
};
use crate::storage::{GradeUpdate, GuardedDelete, SubmissionUpsert};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 为一批提交记录加载附件（按上传顺序）
    async fn attach_files<C: ConnectionTrait>(
        conn: &C,
        models: Vec<Model>,
    ) -> Result<Vec<Submission>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let rows = SubmissionFiles::find()
            .filter(SubmissionFileColumn::SubmissionId.is_in(ids))
            .order_by_asc(SubmissionFileColumn::Id)
            .all(conn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询附件失败: {e}")))?;

        let mut files_by_submission: HashMap<i64, Vec<FileRef>> = HashMap::new();
        for row in rows {
            files_by_submission
                .entry(row.submission_id)
                .or_default()
                .push(row.into_file_ref());
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let files = files_by_submission.remove(&m.id).unwrap_or_default();
                m.into_submission(files)
            })
            .collect())
    }

    async fn load_one<C: ConnectionTrait>(conn: &C, model: Model) -> Result<Submission> {
        let mut loaded = Self::attach_files(conn, vec![model]).await?;
        loaded
            .pop()
            .ok_or_else(|| TrackerError::database_operation("提交记录加载失败"))
    }

    /// 按 (task_id, student_id) 查询提交
    pub async fn find_submission_impl(
        &self,
        task_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>> {
        let model = Submissions::find()
            .filter(Column::TaskId.eq(task_id))
            .filter(Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交失败: {e}")))?;

        match model {
            Some(m) => Ok(Some(Self::load_one(&self.db, m).await?)),
            None => Ok(None),
        }
    }

    /// 创建或更新提交
    ///
    /// 在同一事务内：插入占位行（冲突则忽略）、以 `status <> 'graded'` 为条件更新、
    /// 追加附件行。已评分的记录保持不变并返回 InvalidOperation。
    pub async fn upsert_submission_impl(&self, upsert: SubmissionUpsert) -> Result<Submission> {
        let now = chrono::Utc::now().timestamp();
        let submitted_at = upsert.submitted_at.timestamp();
        let graded = SubmissionStatus::Graded.to_string();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| TrackerError::database_operation(format!("开启事务失败: {e}")))?;

        let placeholder = ActiveModel {
            task_id: Set(upsert.task_id),
            student_id: Set(upsert.student_id),
            submission_text: Set(upsert.submission_text.clone()),
            status: Set(SubmissionStatus::Submitted.to_string()),
            grade: Set(None),
            feedback: Set(None),
            teacher_comments: Set(None),
            notified_owner: Set(false),
            submitted_at: Set(submitted_at),
            graded_at: Set(None),
            graded_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match Submissions::insert(placeholder)
            .on_conflict(
                OnConflict::columns([Column::TaskId, Column::StudentId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
        {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => {
                return Err(TrackerError::database_operation(format!(
                    "创建提交失败: {e}"
                )));
            }
        }

        let mut update = Submissions::update_many()
            .col_expr(
                Column::Status,
                Expr::value(SubmissionStatus::Submitted.to_string()),
            )
            .col_expr(Column::SubmittedAt, Expr::value(submitted_at))
            .col_expr(Column::NotifiedOwner, Expr::value(false))
            .col_expr(Column::UpdatedAt, Expr::value(now));
        if let Some(text) = upsert.submission_text {
            update = update.col_expr(Column::SubmissionText, Expr::value(text));
        }
        update
            .filter(Column::TaskId.eq(upsert.task_id))
            .filter(Column::StudentId.eq(upsert.student_id))
            .filter(Column::Status.ne(graded.clone()))
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("更新提交失败: {e}")))?;

        let model = Submissions::find()
            .filter(Column::TaskId.eq(upsert.task_id))
            .filter(Column::StudentId.eq(upsert.student_id))
            .one(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交失败: {e}")))?
            .ok_or_else(|| TrackerError::database_operation("提交记录写入后不存在"))?;

        // 条件更新不会改动已评分的记录
        if model.status == graded {
            txn.rollback()
                .await
                .map_err(|e| TrackerError::database_operation(format!("回滚事务失败: {e}")))?;
            return Err(TrackerError::invalid_operation(
                "submission has been graded; ask the task owner to reopen it before resubmitting",
            ));
        }

        if !upsert.files.is_empty() {
            let rows = upsert.files.into_iter().map(|f| SubmissionFileActiveModel {
                submission_id: Set(model.id),
                file_id: Set(f.file_id),
                original_name: Set(f.original_name),
                size_bytes: Set(f.size_bytes),
                content_type: Set(f.content_type),
                uploaded_at: Set(f.uploaded_at.timestamp()),
                ..Default::default()
            });
            SubmissionFiles::insert_many(rows)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| TrackerError::database_operation(format!("保存附件失败: {e}")))?;
        }

        let submission = Self::load_one(&txn, model).await?;

        txn.commit()
            .await
            .map_err(|e| TrackerError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(submission)
    }

    /// 通过 ID 获取提交
    pub async fn get_submission_by_id_impl(&self, id: i64) -> Result<Option<Submission>> {
        let model = Submissions::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交失败: {e}")))?;

        match model {
            Some(m) => Ok(Some(Self::load_one(&self.db, m).await?)),
            None => Ok(None),
        }
    }

    /// 通过附件的文件 ID 查找提交
    pub async fn find_submission_by_file_id_impl(
        &self,
        file_id: &str,
    ) -> Result<Option<(Submission, FileRef)>> {
        let Some(row) = SubmissionFiles::find()
            .filter(SubmissionFileColumn::FileId.eq(file_id))
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询附件失败: {e}")))?
        else {
            return Ok(None);
        };

        let submission_id = row.submission_id;
        let file = row.into_file_ref();
        Ok(self
            .get_submission_by_id_impl(submission_id)
            .await?
            .map(|s| (s, file)))
    }

    /// 某任务的全部提交，最新的在前
    pub async fn list_submissions_by_task_impl(&self, task_id: i64) -> Result<Vec<Submission>> {
        let models = Submissions::find()
            .filter(Column::TaskId.eq(task_id))
            .order_by_desc(Column::SubmittedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交列表失败: {e}")))?;

        Self::attach_files(&self.db, models).await
    }

    /// 某学生的全部提交，最新的在前
    pub async fn list_submissions_by_student_impl(
        &self,
        student_id: i64,
    ) -> Result<Vec<Submission>> {
        let models = Submissions::find()
            .filter(Column::StudentId.eq(student_id))
            .order_by_desc(Column::SubmittedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交列表失败: {e}")))?;

        Self::attach_files(&self.db, models).await
    }

    /// 某教师名下所有任务的提交
    pub async fn list_submissions_by_task_owner_impl(
        &self,
        owner_id: i64,
    ) -> Result<Vec<Submission>> {
        let models = Submissions::find()
            .inner_join(Tasks)
            .filter(TaskColumn::OwnerId.eq(owner_id))
            .order_by_desc(Column::SubmittedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交列表失败: {e}")))?;

        Self::attach_files(&self.db, models).await
    }

    /// 全部提交
    pub async fn list_all_submissions_impl(&self) -> Result<Vec<Submission>> {
        let models = Submissions::find()
            .order_by_desc(Column::SubmittedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交列表失败: {e}")))?;

        Self::attach_files(&self.db, models).await
    }

    /// 评分；未提供的评语保留原值
    pub async fn grade_submission_impl(
        &self,
        id: i64,
        update: GradeUpdate,
    ) -> Result<Option<Submission>> {
        let mut stmt = Submissions::update_many()
            .col_expr(Column::Grade, Expr::value(update.grade))
            .col_expr(
                Column::Status,
                Expr::value(SubmissionStatus::Graded.to_string()),
            )
            .col_expr(Column::GradedAt, Expr::value(update.graded_at.timestamp()))
            .col_expr(Column::GradedBy, Expr::value(update.graded_by))
            .col_expr(
                Column::UpdatedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            );
        if let Some(feedback) = update.feedback {
            stmt = stmt.col_expr(Column::Feedback, Expr::value(feedback));
        }
        if let Some(comments) = update.teacher_comments {
            stmt = stmt.col_expr(Column::TeacherComments, Expr::value(comments));
        }

        stmt.filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("评分失败: {e}")))?;

        self.get_submission_by_id_impl(id).await
    }

    /// 退回已评分的提交
    pub async fn reopen_submission_impl(&self, id: i64) -> Result<Option<Submission>> {
        let result = Submissions::update_many()
            .col_expr(
                Column::Status,
                Expr::value(SubmissionStatus::Returned.to_string()),
            )
            .col_expr(
                Column::UpdatedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(SubmissionStatus::Graded.to_string()))
            .exec(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("退回提交失败: {e}")))?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.get_submission_by_id_impl(id).await
    }

    /// 删除未评分的提交，返回其附件供调用方清理文件
    ///
    /// 先对记录做一次带条件的更新以取得行锁，再读取附件列表。
    /// 并发的重新提交要么在此之前提交（其附件会被读到），要么等待本事务结束。
    pub async fn delete_submission_unless_graded_impl(&self, id: i64) -> Result<GuardedDelete> {
        let graded = SubmissionStatus::Graded.to_string();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| TrackerError::database_operation(format!("开启事务失败: {e}")))?;

        Submissions::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(chrono::Utc::now().timestamp()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.ne(graded.clone()))
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("锁定提交失败: {e}")))?;

        // 不依赖 rows_affected，按加锁后的状态判断
        let current = Submissions::find_by_id(id)
            .one(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询提交失败: {e}")))?;

        let outcome = match current {
            None => Some(GuardedDelete::Missing),
            Some(model) if model.status == graded => Some(GuardedDelete::Graded),
            Some(_) => None,
        };
        if let Some(outcome) = outcome {
            txn.rollback()
                .await
                .map_err(|e| TrackerError::database_operation(format!("回滚事务失败: {e}")))?;
            return Ok(outcome);
        }

        let files: Vec<FileRef> = SubmissionFiles::find()
            .filter(SubmissionFileColumn::SubmissionId.eq(id))
            .order_by_asc(SubmissionFileColumn::Id)
            .all(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询附件失败: {e}")))?
            .into_iter()
            .map(|r| r.into_file_ref())
            .collect();

        SubmissionFiles::delete_many()
            .filter(SubmissionFileColumn::SubmissionId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("删除附件失败: {e}")))?;

        Submissions::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::Status.ne(graded))
            .exec(&txn)
            .await
            .map_err(|e| TrackerError::database_operation(format!("删除提交失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| TrackerError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(GuardedDelete::Deleted(files))
    }

    /// 标记已通知任务所有者
    pub async fn mark_owner_notified_impl(&self, id: i64) -> Result<bool> {
        let result = Submissions::update_many()
            .col_expr(Column::NotifiedOwner, Expr::value(true))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("更新通知状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}
