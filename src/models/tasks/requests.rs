use serde::Deserialize;

use super::entities::{
    AssignmentScope, AssignmentType, DEFAULT_ALLOWED_FILE_TYPES, DEFAULT_MAX_FILE_SIZE,
    SubmissionFormat, Task, TaskStatus,
};
use crate::errors::{Result, TrackerError};
use crate::utils::validate::normalize_extension;

// 创建任务请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assignment_type: AssignmentType,
    pub assignee_id: Option<i64>,
    pub target_department: Option<String>,
    pub target_year: Option<i32>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size: Option<i64>,
    pub submission_format: Option<SubmissionFormat>,
    pub status: Option<TaskStatus>,
}

// 更新任务请求，缺省字段保持原值
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    /// 传空字符串清除描述
    pub description: Option<String>,
    pub assignment_type: Option<AssignmentType>,
    pub assignee_id: Option<i64>,
    pub target_department: Option<String>,
    pub target_year: Option<i32>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_file_size: Option<i64>,
    pub submission_format: Option<SubmissionFormat>,
    pub status: Option<TaskStatus>,
}

/// 校验后的任务数据（存储层）
#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub scope: AssignmentScope,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub allowed_file_types: Vec<String>,
    pub max_file_size: i64,
    pub submission_format: SubmissionFormat,
    pub status: TaskStatus,
}

impl CreateTaskRequest {
    /// 根据声明的分配方式取出唯一的范围字段，其余字段必须为空
    pub fn scope(&self) -> Result<AssignmentScope> {
        let department = self
            .target_department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let populated = [
            self.assignee_id.is_some(),
            department.is_some(),
            self.target_year.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        if populated != 1 {
            return Err(TrackerError::invalid_argument(format!(
                "assignment_type '{}' requires exactly one of assignee_id, target_department, target_year",
                self.assignment_type
            )));
        }

        match (self.assignment_type, self.assignee_id, department, self.target_year) {
            (AssignmentType::Individual, Some(assignee_id), _, _) => {
                Ok(AssignmentScope::Individual { assignee_id })
            }
            (AssignmentType::Department, _, Some(dept), _) => Ok(AssignmentScope::Department {
                target_department: dept.to_string(),
            }),
            (AssignmentType::Year, _, _, Some(year)) => {
                Ok(AssignmentScope::Year { target_year: year })
            }
            (kind, ..) => Err(TrackerError::invalid_argument(format!(
                "assignment_type '{kind}' does not match the populated scope field"
            ))),
        }
    }

    pub fn into_new_task(self, owner_id: i64) -> Result<NewTask> {
        let scope = self.scope()?;

        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(TrackerError::invalid_argument("title must not be empty"));
        }

        let max_file_size = self.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE);
        if max_file_size <= 0 {
            return Err(TrackerError::invalid_argument(
                "max_file_size must be greater than 0",
            ));
        }

        let mut allowed_file_types = match self.allowed_file_types {
            Some(types) => types
                .iter()
                .map(|t| normalize_extension(t))
                .collect::<Result<Vec<_>>>()?,
            None => DEFAULT_ALLOWED_FILE_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        };
        allowed_file_types.sort();
        allowed_file_types.dedup();

        let submission_format = self.submission_format.unwrap_or(SubmissionFormat::File);
        if allowed_file_types.is_empty() && submission_format.accepts_files() {
            return Err(TrackerError::invalid_argument(
                "allowed_file_types must not be empty when files are accepted",
            ));
        }

        Ok(NewTask {
            owner_id,
            title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            scope,
            due_date: self.due_date,
            allowed_file_types,
            max_file_size,
            submission_format,
            status: self.status.unwrap_or(TaskStatus::Active),
        })
    }
}

impl UpdateTaskRequest {
    fn touches_scope(&self) -> bool {
        self.assignment_type.is_some()
            || self.assignee_id.is_some()
            || self.target_department.is_some()
            || self.target_year.is_some()
    }

    /// 把修改合并到当前任务上，得到一份完整的任务请求，再走与创建相同的校验
    ///
    /// 分配范围要么不动，要么连同 `assignment_type` 整体重新给出。
    pub fn merge_into(self, current: &Task) -> Result<CreateTaskRequest> {
        let (assignment_type, assignee_id, target_department, target_year) =
            if self.touches_scope() {
                let kind = self.assignment_type.ok_or_else(|| {
                    TrackerError::invalid_argument(
                        "assignment_type is required when changing the assignment scope",
                    )
                })?;
                (kind, self.assignee_id, self.target_department, self.target_year)
            } else {
                match &current.scope {
                    AssignmentScope::Individual { assignee_id } => {
                        (AssignmentType::Individual, Some(*assignee_id), None, None)
                    }
                    AssignmentScope::Department { target_department } => (
                        AssignmentType::Department,
                        None,
                        Some(target_department.clone()),
                        None,
                    ),
                    AssignmentScope::Year { target_year } => {
                        (AssignmentType::Year, None, None, Some(*target_year))
                    }
                }
            };

        Ok(CreateTaskRequest {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: self.description.or_else(|| current.description.clone()),
            assignment_type,
            assignee_id,
            target_department,
            target_year,
            due_date: self.due_date.or(current.due_date),
            allowed_file_types: Some(
                self.allowed_file_types
                    .unwrap_or_else(|| current.allowed_file_types.clone()),
            ),
            max_file_size: Some(self.max_file_size.unwrap_or(current.max_file_size)),
            submission_format: Some(self.submission_format.unwrap_or(current.submission_format)),
            status: Some(self.status.unwrap_or(current.status)),
        })
    }
}
