//! 访问控制判定
//!
//! 纯函数，不访问存储。所有涉及任务或提交记录的服务操作都经由这里判断权限。

use crate::models::{
    submissions::entities::Submission,
    tasks::entities::{AssignmentScope, Task},
    users::entities::{User, UserRole},
};

/// 是否为任务的创建者
pub fn is_task_owner(user_id: i64, task: &Task) -> bool {
    task.owner_id == user_id
}

/// 是否为提交的学生本人
pub fn is_submission_owner(user_id: i64, submission: &Submission) -> bool {
    submission.student_id == user_id
}

/// 学生是否在任务的分配范围内
///
/// 直接指派按 ID 匹配；院系（不区分大小写）和年级范围只对学生生效。
pub fn is_assignee_of(student: &User, task: &Task) -> bool {
    match &task.scope {
        AssignmentScope::Individual { assignee_id } => *assignee_id == student.id,
        AssignmentScope::Department { target_department } => {
            student.role == UserRole::Student
                && student
                    .department
                    .as_deref()
                    .is_some_and(|d| d.trim().eq_ignore_ascii_case(target_department.trim()))
        }
        AssignmentScope::Year { target_year } => {
            student.role == UserRole::Student && student.year == Some(*target_year)
        }
    }
}

/// 任务所有者与提交学生可以查看提交
pub fn can_read_submission(user_id: i64, task: &Task, submission: &Submission) -> bool {
    is_task_owner(user_id, task) || is_submission_owner(user_id, submission)
}

/// 任务所有者、管理员与分配范围内的学生可以查看任务
pub fn can_view_task(user: &User, task: &Task) -> bool {
    user.is_admin() || is_task_owner(user.id, task) || is_assignee_of(user, task)
}
