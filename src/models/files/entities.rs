use bytes::Bytes;
use serde::Serialize;

/// 提交中引用的单个文件
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileRef {
    /// 文件存储中的键
    pub file_id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// 从 multipart 读入内存、尚未存储的文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 小写扩展名（不含点），无扩展名时返回 None
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.original_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            data: Bytes::from_static(b"x"),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(file("Report.PDF").extension().as_deref(), Some("pdf"));
        assert_eq!(file("archive.tar.gz").extension().as_deref(), Some("gz"));
        assert_eq!(file("README").extension(), None);
        assert_eq!(file(".bashrc").extension(), None);
        assert_eq!(file("trailing.").extension(), None);
    }
}
