//! 任务实体

use sea_orm::entity::prelude::*;

use super::from_timestamp;
use crate::errors::TrackerError;
use crate::models::tasks::entities::{
    AssignmentScope, AssignmentType, SubmissionFormat, Task, TaskStatus,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub assignment_type: String,
    pub assignee_id: Option<i64>,
    pub target_department: Option<String>,
    pub target_year: Option<i32>,
    pub due_date: Option<i64>,
    /// JSON 数组
    #[sea_orm(column_type = "Text")]
    pub allowed_file_types: String,
    pub max_file_size: i64,
    pub submission_format: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::submissions::Entity")]
    Submissions,
    #[sea_orm(has_many = "super::task_files::Entity")]
    Files,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl Related<super::task_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Files.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_task(self) -> crate::errors::Result<Task> {
        let assignment_type = self
            .assignment_type
            .parse::<AssignmentType>()
            .map_err(TrackerError::database_operation)?;

        let scope = match (
            assignment_type,
            self.assignee_id,
            self.target_department,
            self.target_year,
        ) {
            (AssignmentType::Individual, Some(assignee_id), _, _) => {
                AssignmentScope::Individual { assignee_id }
            }
            (AssignmentType::Department, _, Some(target_department), _) => {
                AssignmentScope::Department { target_department }
            }
            (AssignmentType::Year, _, _, Some(target_year)) => {
                AssignmentScope::Year { target_year }
            }
            _ => {
                return Err(TrackerError::database_operation(format!(
                    "任务 {} 的分配范围字段缺失",
                    self.id
                )));
            }
        };

        let allowed_file_types: Vec<String> = serde_json::from_str(&self.allowed_file_types)?;

        Ok(Task {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            scope,
            due_date: self.due_date.map(from_timestamp),
            allowed_file_types,
            max_file_size: self.max_file_size,
            submission_format: self
                .submission_format
                .parse::<SubmissionFormat>()
                .unwrap_or(SubmissionFormat::File),
            status: self.status.parse::<TaskStatus>().unwrap_or(TaskStatus::Closed),
            created_at: from_timestamp(self.created_at),
            updated_at: from_timestamp(self.updated_at),
        })
    }
}
