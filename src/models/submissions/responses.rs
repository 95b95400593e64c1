use serde::Serialize;

use super::entities::Submission;

/// 提交成功后的回执
#[derive(Debug, Serialize)]
pub struct SubmissionReceipt {
    pub submission: Submission,
    pub is_late: bool,
}

/// 教师查看列表时附带迟交标记
#[derive(Debug, Serialize)]
pub struct SubmissionWithLateness {
    #[serde(flatten)]
    pub submission: Submission,
    pub is_late: bool,
}
