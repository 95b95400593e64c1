use serde::Serialize;

use crate::models::define_str_enum;

// 通知类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SubmissionReceived,
}

define_str_enum!(NotificationKind, "通知类型", {
    SubmissionReceived => "submission_received",
});

// 站内通知
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub content: Option<String>,
    /// 关联的业务 ID（提交 ID）
    pub reference_id: Option<i64>,
    pub is_read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 待写入的通知
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub content: Option<String>,
    pub reference_id: Option<i64>,
}
