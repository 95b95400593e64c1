use super::NotificationService;
use crate::errors::Result;
use crate::models::notifications::entities::Notification;

pub async fn list_notifications(
    service: &NotificationService,
    user_id: i64,
) -> Result<Vec<Notification>> {
    service.storage.list_notifications(user_id).await
}
