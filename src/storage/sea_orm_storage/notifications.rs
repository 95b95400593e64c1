use super::SeaOrmStorage;
use crate::entity::notifications::{ActiveModel, Column, Entity as Notifications};
use crate::errors::{Result, TrackerError};
use crate::models::notifications::entities::{NewNotification, Notification};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

impl SeaOrmStorage {
    /// 写入通知
    pub async fn create_notification_impl(
        &self,
        notification: NewNotification,
    ) -> Result<Notification> {
        let model = ActiveModel {
            user_id: Set(notification.user_id),
            kind: Set(notification.kind.to_string()),
            title: Set(notification.title),
            content: Set(notification.content),
            reference_id: Set(notification.reference_id),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("创建通知失败: {e}")))?;

        Ok(result.into_notification())
    }

    /// 列出用户的通知，最新的在前
    pub async fn list_notifications_impl(&self, user_id: i64) -> Result<Vec<Notification>> {
        let models = Notifications::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询通知失败: {e}")))?;

        Ok(models.into_iter().map(|m| m.into_notification()).collect())
    }
}
