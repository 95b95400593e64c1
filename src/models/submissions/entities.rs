use serde::Serialize;

use crate::models::define_str_enum;
use crate::models::files::entities::FileRef;

/// 分数允许的最小值
pub const MIN_GRADE: f64 = 0.0;
/// 分数允许的最大值
pub const MAX_GRADE: f64 = 100.0;

// 提交状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted, // 已提交
    Reviewed,  // 已查看
    Graded,    // 已评分
    Returned,  // 已退回，可重新提交
}

define_str_enum!(SubmissionStatus, "提交状态", {
    Submitted => "submitted",
    Reviewed => "reviewed",
    Graded => "graded",
    Returned => "returned",
});

// 提交实体，每个 (task_id, student_id) 仅一条
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: i64,
    pub task_id: i64,
    pub student_id: i64,
    pub files: Vec<FileRef>,
    pub submission_text: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub status: SubmissionStatus,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub teacher_comments: Option<String>,
    pub notified_owner: bool,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub graded_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Submission {
    pub fn is_graded(&self) -> bool {
        self.status == SubmissionStatus::Graded
    }
}
