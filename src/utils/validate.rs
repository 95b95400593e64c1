use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, TrackerError};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid username regex"));

static EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{1,10}$").expect("Invalid extension regex"));

pub fn validate_username(username: &str) -> std::result::Result<(), &'static str> {
    // 用户名长度校验：5 <= x <= 16
    if username.len() < 5 || username.len() > 16 {
        return Err("Username length must be between 5 and 16 characters");
    }
    // 用户名格式校验：只能包含字母、数字、下划线或连字符
    if !USERNAME_RE.is_match(username) {
        return Err("Username must contain only letters, numbers, underscores or hyphens");
    }
    Ok(())
}

/// 密码策略验证结果
#[derive(Debug, Clone)]
pub struct PasswordValidationResult {
    pub is_valid: bool,
    pub errors: Vec<&'static str>,
}

impl PasswordValidationResult {
    pub fn error_message(&self) -> String {
        self.errors.join("; ")
    }
}

/// 验证密码是否符合安全策略
///
/// 策略要求：
/// - 最小长度：8 字符
/// - 必须包含：大写字母 + 小写字母 + 数字
pub fn validate_password(password: &str) -> PasswordValidationResult {
    let mut errors = Vec::new();

    if password.len() < 8 {
        errors.push("Password must be at least 8 characters long");
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one digit");
    }

    // 常见弱密码
    let weak_passwords = [
        "password1",
        "qwerty123",
        "admin123",
        "abcd1234",
        "student1",
        "teacher1",
    ];
    if weak_passwords
        .iter()
        .any(|&weak| password.eq_ignore_ascii_case(weak))
    {
        errors.push("Password is too common, please choose a stronger password");
    }

    PasswordValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// 规范化文件扩展名：去掉前导点、转小写，只允许字母数字
pub fn normalize_extension(raw: &str) -> Result<String> {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if !EXTENSION_RE.is_match(&ext) {
        return Err(TrackerError::invalid_argument(format!(
            "invalid file extension '{raw}'"
        )));
    }
    Ok(ext)
}
