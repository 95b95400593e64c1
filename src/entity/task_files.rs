//! 任务参考资料实体

use sea_orm::entity::prelude::*;

use super::from_timestamp;
use crate::models::files::entities::FileRef;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "task_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub task_id: i64,
    #[sea_orm(unique)]
    pub file_id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub uploaded_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tasks::Entity",
        from = "Column::TaskId",
        to = "super::tasks::Column::Id",
        on_delete = "Cascade"
    )]
    Task,
}

impl Related<super::tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_file_ref(self) -> FileRef {
        FileRef {
            file_id: self.file_id,
            original_name: self.original_name,
            size_bytes: self.size_bytes,
            content_type: self.content_type,
            uploaded_at: from_timestamp(self.uploaded_at),
        }
    }
}
