pub mod list;

use std::sync::Arc;

use crate::errors::Result;
use crate::models::notifications::entities::Notification;
use crate::storage::Storage;

pub struct NotificationService {
    storage: Arc<dyn Storage>,
}

impl NotificationService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 当前用户的通知，最新的在前
    pub async fn list(&self, user_id: i64) -> Result<Vec<Notification>> {
        list::list_notifications(self, user_id).await
    }
}
