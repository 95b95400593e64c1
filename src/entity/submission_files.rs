//! 提交附件实体

use sea_orm::entity::prelude::*;

use super::from_timestamp;
use crate::models::files::entities::FileRef;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submission_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
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
        belongs_to = "super::submissions::Entity",
        from = "Column::SubmissionId",
        to = "super::submissions::Column::Id",
        on_delete = "Cascade"
    )]
    Submission,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
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
