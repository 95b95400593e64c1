use serde::Serialize;

use crate::models::define_str_enum;

/// 未指定时允许的扩展名
pub const DEFAULT_ALLOWED_FILE_TYPES: &[&str] = &["pdf", "doc", "docx"];
/// 未指定时的单文件上限（10 MiB）
pub const DEFAULT_MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;

// 分配方式
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Individual,
    Department,
    Year,
}

define_str_enum!(AssignmentType, "分配方式", {
    Individual => "individual",
    Department => "department",
    Year => "year",
});

/// 任务的分配范围，三者必居其一
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "assignment_type", rename_all = "snake_case")]
pub enum AssignmentScope {
    Individual { assignee_id: i64 },
    Department { target_department: String },
    Year { target_year: i32 },
}

impl AssignmentScope {
    pub fn assignment_type(&self) -> AssignmentType {
        match self {
            AssignmentScope::Individual { .. } => AssignmentType::Individual,
            AssignmentScope::Department { .. } => AssignmentType::Department,
            AssignmentScope::Year { .. } => AssignmentType::Year,
        }
    }
}

// 提交形式
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionFormat {
    File, // 仅文件
    Text, // 仅文本
    Both, // 文件与文本均可
}

define_str_enum!(SubmissionFormat, "提交形式", {
    File => "file",
    Text => "text",
    Both => "both",
});

impl SubmissionFormat {
    pub fn accepts_files(&self) -> bool {
        !matches!(self, SubmissionFormat::Text)
    }

    pub fn accepts_text_only(&self) -> bool {
        !matches!(self, SubmissionFormat::File)
    }
}

// 任务状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active, // 接受提交
    Closed, // 已关闭
    Draft,  // 草稿
}

define_str_enum!(TaskStatus, "任务状态", {
    Active => "active",
    Closed => "closed",
    Draft => "draft",
});

// 任务实体
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub scope: AssignmentScope,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    /// 小写、不带点的扩展名
    pub allowed_file_types: Vec<String>,
    pub max_file_size: i64,
    pub submission_format: SubmissionFormat,
    pub status: TaskStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.allowed_file_types.iter().any(|t| t == ext)
    }

    /// 给定提交时间是否晚于截止时间；无截止时间则永不迟交
    pub fn is_late_at(&self, submitted_at: chrono::DateTime<chrono::Utc>) -> bool {
        self.due_date.is_some_and(|due| submitted_at > due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task_due(due: Option<chrono::DateTime<chrono::Utc>>) -> Task {
        let now = chrono::Utc::now();
        Task {
            id: 1,
            owner_id: 1,
            title: "Essay".to_string(),
            description: None,
            scope: AssignmentScope::Year { target_year: 2 },
            due_date: due,
            allowed_file_types: vec!["pdf".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            submission_format: SubmissionFormat::File,
            status: TaskStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_late_at() {
        let due = chrono::Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let task = task_due(Some(due));
        assert!(!task.is_late_at(due));
        assert!(task.is_late_at(due + chrono::Duration::seconds(1)));
        assert!(!task.is_late_at(due - chrono::Duration::days(1)));
    }

    #[test]
    fn test_never_late_without_due_date() {
        let task = task_due(None);
        let far_future = chrono::Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        assert!(!task.is_late_at(far_future));
    }

    #[test]
    fn test_scope_serializes_with_tag() {
        let task = task_due(None);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["assignment_type"], "year");
        assert_eq!(value["target_year"], 2);
    }

    #[test]
    fn test_submission_format_rules() {
        assert!(SubmissionFormat::File.accepts_files());
        assert!(!SubmissionFormat::File.accepts_text_only());
        assert!(!SubmissionFormat::Text.accepts_files());
        assert!(SubmissionFormat::Both.accepts_files());
        assert!(SubmissionFormat::Both.accepts_text_only());
    }
}
