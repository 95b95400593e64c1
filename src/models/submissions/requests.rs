use serde::Deserialize;

// 评分请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeSubmissionRequest {
    pub grade: f64,
    pub feedback: Option<String>,
    pub teacher_comments: Option<String>,
}

// 提交列表查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmissionListQuery {
    #[serde(default)]
    pub all: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_request_rejects_unknown_fields() {
        let ok = r#"{"grade": 85, "feedback": "good"}"#;
        let req: GradeSubmissionRequest = serde_json::from_str(ok).unwrap();
        assert_eq!(req.grade, 85.0);
        assert!(req.teacher_comments.is_none());

        let bad = r#"{"grade": 85, "status": "graded"}"#;
        assert!(serde_json::from_str::<GradeSubmissionRequest>(bad).is_err());
    }
}
