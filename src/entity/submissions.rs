//! 提交实体

use sea_orm::entity::prelude::*;

use super::from_timestamp;
use crate::models::files::entities::FileRef;
use crate::models::submissions::entities::{Submission, SubmissionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub task_id: i64,
    pub student_id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub submission_text: Option<String>,
    pub status: String,
    #[sea_orm(column_type = "Double", nullable)]
    pub grade: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub teacher_comments: Option<String>,
    pub notified_owner: bool,
    pub submitted_at: i64,
    pub graded_at: Option<i64>,
    pub graded_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tasks::Entity",
        from = "Column::TaskId",
        to = "super::tasks::Column::Id"
    )]
    Task,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::StudentId",
        to = "super::users::Column::Id"
    )]
    Student,
    #[sea_orm(has_many = "super::submission_files::Entity")]
    Files,
}

impl Related<super::tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::submission_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Files.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 附件需由调用方单独查询后传入
    pub fn into_submission(self, files: Vec<FileRef>) -> Submission {
        Submission {
            id: self.id,
            task_id: self.task_id,
            student_id: self.student_id,
            files,
            submission_text: self.submission_text,
            submitted_at: from_timestamp(self.submitted_at),
            status: self
                .status
                .parse::<SubmissionStatus>()
                .unwrap_or(SubmissionStatus::Submitted),
            grade: self.grade,
            feedback: self.feedback,
            teacher_comments: self.teacher_comments,
            notified_owner: self.notified_owner,
            graded_at: self.graded_at.map(from_timestamp),
            graded_by: self.graded_by,
            created_at: from_timestamp(self.created_at),
            updated_at: from_timestamp(self.updated_at),
        }
    }
}
