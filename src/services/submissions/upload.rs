use actix_multipart::{Field, Multipart};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use tracing::warn;

use super::UploadSettings;
use crate::blob_store::{BlobMetadata, BlobStore};
use crate::errors::{Result, TrackerError};
use crate::models::files::entities::UploadedFile;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
// 文本字段的上限
const MAX_TEXT_FIELD_SIZE: usize = 64 * 1024;

/// 解析后的提交表单
#[derive(Debug)]
pub struct SubmitForm {
    pub task_id: i64,
    pub submission_text: Option<String>,
    pub files: Vec<UploadedFile>,
}

/// 读取 multipart 提交表单
///
/// 文件数量与单文件硬上限在读取时就检查，扩展名等任务规则由 `submit` 校验。
pub async fn read_submit_form(
    mut payload: Multipart,
    settings: &UploadSettings,
) -> Result<SubmitForm> {
    let mut task_id = None;
    let mut submission_text = None;
    let mut files = Vec::new();

    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|e| TrackerError::invalid_argument(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "taskId" | "task_id" => {
                let raw = read_text(field).await?;
                let id = raw.trim().parse::<i64>().map_err(|_| {
                    TrackerError::invalid_argument("Valid task ID is required")
                })?;
                task_id = Some(id);
            }
            "submissionText" | "submission_text" => {
                submission_text = Some(read_text(field).await?);
            }
            "files" | "file" => {
                if files.len() >= settings.max_files {
                    return Err(TrackerError::invalid_argument(format!(
                        "At most {} files can be submitted at once",
                        settings.max_files
                    )));
                }
                files.push(read_file(field, settings.max_size).await?);
            }
            other => {
                return Err(TrackerError::invalid_argument(format!(
                    "Unknown form field '{other}'"
                )));
            }
        }
    }

    let task_id =
        task_id.ok_or_else(|| TrackerError::invalid_argument("Valid task ID is required"))?;

    Ok(SubmitForm {
        task_id,
        submission_text,
        files,
    })
}

/// 读取只含文件的 multipart 表单（任务参考资料）
pub async fn read_file_form(
    mut payload: Multipart,
    settings: &UploadSettings,
) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(field) = payload
        .try_next()
        .await
        .map_err(|e| TrackerError::invalid_argument(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !matches!(name.as_str(), "files" | "file" | "referenceFiles") {
            return Err(TrackerError::invalid_argument(format!(
                "Unknown form field '{name}'"
            )));
        }
        if files.len() >= settings.max_files {
            return Err(TrackerError::invalid_argument(format!(
                "At most {} files can be uploaded at once",
                settings.max_files
            )));
        }
        files.push(read_file(field, settings.max_size).await?);
    }

    if files.is_empty() {
        return Err(TrackerError::invalid_argument("Please upload at least one file"));
    }
    Ok(files)
}

async fn read_file(mut field: Field, max_size: usize) -> Result<UploadedFile> {
    let original_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TrackerError::invalid_argument("Uploaded file is missing a filename"))?;

    let content_type = field
        .content_type()
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| TrackerError::invalid_argument(format!("Failed to read upload: {e}")))?
    {
        if buf.len() + chunk.len() > max_size {
            return Err(TrackerError::invalid_argument(format!(
                "File '{original_name}' exceeds the maximum size of {max_size} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(UploadedFile {
        original_name,
        content_type,
        data: buf.freeze(),
    })
}

async fn read_text(mut field: Field) -> Result<String> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| TrackerError::invalid_argument(format!("Failed to read form field: {e}")))?
    {
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_SIZE {
            return Err(TrackerError::invalid_argument("Form field is too large"));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf.to_vec())
        .map_err(|_| TrackerError::invalid_argument("Form field is not valid UTF-8"))
}

/// 存储单个文件：每次尝试有超时，可重试的错误按线性退避重试
pub(crate) async fn store_with_retry(
    blobs: &dyn BlobStore,
    settings: &UploadSettings,
    file: &UploadedFile,
    metadata: BlobMetadata,
) -> Result<String> {
    let attempts = settings.store_retries + 1;
    let timeout = settings.io_timeout;
    let mut last_error = None;

    for attempt in 1..=attempts {
        let outcome = tokio::time::timeout(
            timeout,
            blobs.store(file.data.clone(), &file.content_type, metadata.clone()),
        )
        .await;

        let err = match outcome {
            Ok(Ok(file_id)) => return Ok(file_id),
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => e,
            Err(_) => TrackerError::upstream_unavailable(format!(
                "blob store timed out after {} ms",
                timeout.as_millis()
            )),
        };

        warn!(
            "Storing '{}' failed (attempt {}/{}): {}",
            file.original_name, attempt, attempts, err
        );
        last_error = Some(err);

        if attempt < attempts {
            tokio::time::sleep(std::time::Duration::from_millis(50 * u64::from(attempt))).await;
        }
    }

    Err(TrackerError::upstream_unavailable(format!(
        "failed to store '{}' after {attempts} attempt(s): {}",
        file.original_name,
        last_error.map(|e| e.message().to_string()).unwrap_or_default()
    )))
}
