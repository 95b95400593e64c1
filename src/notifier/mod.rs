//! 提交通知
//!
//! 提交落库后在独立的 tokio 任务中通知任务所有者。通知失败只记录日志，
//! 并体现在 `notified_owner` 标记上，不会影响提交本身。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::NotifierConfig;
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::FileRef;
use crate::models::notifications::entities::{NewNotification, NotificationKind};
use crate::storage::Storage;

/// 一次提交事件
#[derive(Debug, Clone)]
pub struct SubmissionEvent {
    pub submission_id: i64,
    pub task_id: i64,
    pub task_title: String,
    pub owner_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub is_late: bool,
    /// 本次新上传的文件
    pub files: Vec<FileRef>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl SubmissionEvent {
    pub fn title(&self) -> String {
        format!(
            "{}New Assignment Submission: {}",
            if self.is_late { "[LATE] " } else { "" },
            self.task_title
        )
    }

    pub fn body(&self) -> String {
        let mut lines = vec![
            format!("Student: {}", self.student_name),
            format!("Submitted at: {}", self.submitted_at.to_rfc3339()),
            format!("Files uploaded: {}", self.files.len()),
        ];
        for file in &self.files {
            lines.push(format!(
                "- {} ({:.2} MB)",
                file.original_name,
                file.size_bytes as f64 / 1024.0 / 1024.0
            ));
        }
        lines.join("\n")
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &SubmissionEvent) -> Result<()>;
}

/// 写入站内通知
pub struct InAppNotifier {
    storage: Arc<dyn Storage>,
}

impl InAppNotifier {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Notifier for InAppNotifier {
    async fn notify(&self, event: &SubmissionEvent) -> Result<()> {
        self.storage
            .create_notification(NewNotification {
                user_id: event.owner_id,
                kind: NotificationKind::SubmissionReceived,
                title: event.title(),
                content: Some(event.body()),
                reference_id: Some(event.submission_id),
            })
            .await?;
        Ok(())
    }
}

/// 通知的分发句柄
///
/// 每次分发都在独立任务中执行，并受自身超时约束。
#[derive(Clone)]
pub struct NotifierHandle {
    inner: Option<Arc<dyn Notifier>>,
    timeout: Duration,
    storage: Arc<dyn Storage>,
}

impl NotifierHandle {
    pub fn new(
        inner: Option<Arc<dyn Notifier>>,
        timeout: Duration,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            inner,
            timeout,
            storage,
        }
    }

    /// 根据配置创建默认的站内通知
    pub fn from_config(config: &NotifierConfig, storage: Arc<dyn Storage>) -> Self {
        let inner: Option<Arc<dyn Notifier>> = if config.enabled {
            Some(Arc::new(InAppNotifier::new(storage.clone())))
        } else {
            None
        };
        Self::new(inner, Duration::from_millis(config.timeout_ms), storage)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// 分发通知，立即返回
    ///
    /// 未启用时返回 None。
    pub fn dispatch(&self, event: SubmissionEvent) -> Option<JoinHandle<()>> {
        let notifier = self.inner.clone()?;
        let storage = self.storage.clone();
        let timeout = self.timeout;

        Some(tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, notifier.notify(&event)).await {
                Ok(res) => res,
                Err(_) => Err(TrackerError::upstream_unavailable(format!(
                    "notifier timed out after {} ms",
                    timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(()) => match storage.mark_owner_notified(event.submission_id).await {
                    Ok(_) => debug!(
                        "Owner {} notified of submission {}",
                        event.owner_id, event.submission_id
                    ),
                    Err(e) => warn!(
                        "{}",
                        TrackerError::partial_failure(format!(
                            "failed to flag submission {} as notified: {e}",
                            event.submission_id
                        ))
                    ),
                },
                Err(e) => warn!(
                    "{}",
                    TrackerError::partial_failure(format!(
                        "notification for submission {} failed: {e}",
                        event.submission_id
                    ))
                ),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sea_orm_storage::SeaOrmStorage;
    use std::sync::Mutex;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _event: &SubmissionEvent) -> Result<()> {
            Err(TrackerError::upstream_unavailable("smtp down"))
        }
    }

    struct SlowNotifier;

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn notify(&self, _event: &SubmissionEvent) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, event: &SubmissionEvent) -> Result<()> {
            self.titles.lock().unwrap().push(event.title());
            Ok(())
        }
    }

    fn event(is_late: bool) -> SubmissionEvent {
        SubmissionEvent {
            submission_id: 999,
            task_id: 1,
            task_title: "Essay".to_string(),
            owner_id: 1,
            student_id: 2,
            student_name: "alice".to_string(),
            is_late,
            files: vec![FileRef {
                file_id: "f".to_string(),
                original_name: "essay.pdf".to_string(),
                size_bytes: 512 * 1024,
                content_type: "application/pdf".to_string(),
                uploaded_at: chrono::Utc::now(),
            }],
            submitted_at: chrono::Utc::now(),
        }
    }

    async fn storage() -> Arc<dyn Storage> {
        Arc::new(SeaOrmStorage::open_in_memory().await.unwrap())
    }

    #[test]
    fn test_title_flags_late_submissions() {
        assert_eq!(event(false).title(), "New Assignment Submission: Essay");
        assert_eq!(event(true).title(), "[LATE] New Assignment Submission: Essay");
        assert!(event(false).body().contains("essay.pdf (0.50 MB)"));
    }

    #[tokio::test]
    async fn test_dispatch_runs_notifier() {
        let recorder = Arc::new(RecordingNotifier::default());
        let handle = NotifierHandle::new(
            Some(recorder.clone()),
            Duration::from_secs(1),
            storage().await,
        );

        handle.dispatch(event(true)).unwrap().await.unwrap();
        assert_eq!(
            recorder.titles.lock().unwrap().as_slice(),
            ["[LATE] New Assignment Submission: Essay".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let handle = NotifierHandle::new(
            Some(Arc::new(FailingNotifier)),
            Duration::from_secs(1),
            storage().await,
        );
        // 任务正常结束，不会 panic
        handle.dispatch(event(false)).unwrap().await.unwrap();

        let handle = NotifierHandle::new(
            Some(Arc::new(SlowNotifier)),
            Duration::from_millis(20),
            storage().await,
        );
        handle.dispatch(event(false)).unwrap().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_handle_skips_dispatch() {
        let config = NotifierConfig {
            enabled: false,
            timeout_ms: 100,
        };
        let handle = NotifierHandle::from_config(&config, storage().await);
        assert!(!handle.is_enabled());
        assert!(handle.dispatch(event(false)).is_none());
    }
}
