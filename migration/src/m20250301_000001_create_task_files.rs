use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 任务参考资料表
        manager
            .create_table(
                Table::create()
                    .table(TaskFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskFiles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskFiles::TaskId).big_integer().not_null())
                    .col(
                        ColumnDef::new(TaskFiles::FileId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(TaskFiles::OriginalName).string().not_null())
                    .col(ColumnDef::new(TaskFiles::SizeBytes).big_integer().not_null())
                    .col(ColumnDef::new(TaskFiles::ContentType).string().not_null())
                    .col(ColumnDef::new(TaskFiles::UploadedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(TaskFiles::Table, TaskFiles::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_files_task_id")
                    .table(TaskFiles::Table)
                    .col(TaskFiles::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskFiles::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Tasks {
    #[sea_orm(iden = "tasks")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum TaskFiles {
    #[sea_orm(iden = "task_files")]
    Table,
    Id,
    TaskId,
    FileId,
    OriginalName,
    SizeBytes,
    ContentType,
    UploadedAt,
}
