use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::debug;
use uuid::Uuid;

use super::{BlobMetadata, BlobObject, BlobStore};
use crate::errors::{Result, TrackerError};

const CHUNK_SIZE: usize = 64 * 1024;

/// 与文件内容同目录保存的描述信息
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    size: u64,
    metadata: BlobMetadata,
}

/// 本地目录后端：`<id>.bin` 保存内容，`<id>.meta.json` 保存描述信息
pub struct LocalBlobStore {
    root: PathBuf,
}

// 读取与删除：文件不存在即 NotFound
fn io_error(action: &str, file_id: &str, err: std::io::Error) -> TrackerError {
    if err.kind() == std::io::ErrorKind::NotFound {
        TrackerError::not_found(format!("file {file_id} not found"))
    } else {
        TrackerError::upstream_unavailable(format!("blob store {action} failed for {file_id}: {err}"))
    }
}

// 写入：ID 由本地生成，任何 I/O 失败（包括目录缺失）都视为存储暂时不可用
fn write_error(file_id: &str, err: std::io::Error) -> TrackerError {
    TrackerError::upstream_unavailable(format!("blob store write failed for {file_id}: {err}"))
}

impl LocalBlobStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            TrackerError::file_operation(format!(
                "无法创建上传目录 {}: {e}",
                root.display()
            ))
        })?;
        debug!("Local blob store rooted at {}", root.display());
        Ok(Self { root })
    }

    /// 只接受 UUID 形式的 ID，防止路径穿越
    fn paths(&self, file_id: &str) -> Result<(PathBuf, PathBuf)> {
        let id = Uuid::parse_str(file_id)
            .map_err(|_| TrackerError::not_found(format!("file {file_id} not found")))?;
        Ok((
            self.root.join(format!("{id}.bin")),
            self.root.join(format!("{id}.meta.json")),
        ))
    }

    async fn read_sidecar(&self, file_id: &str, path: &Path) -> Result<Sidecar> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| io_error("read", file_id, e))?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(
        &self,
        data: Bytes,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<String> {
        let file_id = Uuid::new_v4().to_string();
        let (bin, meta) = self.paths(&file_id)?;
        let partial = bin.with_extension("part");

        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            size: data.len() as u64,
            metadata,
        };
        let sidecar_json = serde_json::to_vec(&sidecar)?;

        // 先写临时文件再改名，读者不会看到写了一半的内容
        let written = async {
            tokio::fs::write(&partial, &data).await?;
            tokio::fs::write(&meta, sidecar_json).await?;
            tokio::fs::rename(&partial, &bin).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&partial).await;
            let _ = tokio::fs::remove_file(&meta).await;
            return Err(write_error(&file_id, e));
        }

        debug!("Stored blob {} ({} bytes)", file_id, sidecar.size);
        Ok(file_id)
    }

    async fn retrieve(&self, file_id: &str) -> Result<BlobObject> {
        let (bin, meta) = self.paths(file_id)?;
        let sidecar = self.read_sidecar(file_id, &meta).await?;
        let file = tokio::fs::File::open(&bin)
            .await
            .map_err(|e| io_error("open", file_id, e))?;

        let stream = futures_util::stream::try_unfold(file, |mut file| async move {
            let mut buf = BytesMut::zeroed(CHUNK_SIZE);
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);
            Ok(Some((buf.freeze(), file)))
        });

        Ok(BlobObject {
            size: sidecar.size,
            content_type: sidecar.content_type,
            metadata: sidecar.metadata,
            stream: Box::pin(stream),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let (bin, meta) = self.paths(file_id)?;
        tokio::fs::remove_file(&bin)
            .await
            .map_err(|e| io_error("delete", file_id, e))?;
        if let Err(e) = tokio::fs::remove_file(&meta).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            return Err(io_error("delete", file_id, e));
        }
        debug!("Deleted blob {}", file_id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("tracker-blobs-{}", Uuid::new_v4())))
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[tokio::test]
    async fn test_store_retrieve_delete() {
        let dir = TempDir::new();
        let store = LocalBlobStore::open(&dir.0).await.unwrap();

        // 跨越多个块
        let payload: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let mut metadata = BlobMetadata::new();
        metadata.insert("task_id".to_string(), "7".to_string());

        let id = store
            .store(Bytes::from(payload.clone()), "application/pdf", metadata)
            .await
            .unwrap();

        let object = store.retrieve(&id).await.unwrap();
        assert_eq!(object.size, payload.len() as u64);
        assert_eq!(object.content_type, "application/pdf");
        assert_eq!(object.metadata.get("task_id").map(String::as_str), Some("7"));

        let chunks: Vec<Bytes> = object.stream.try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), payload);

        store.delete(&id).await.unwrap();
        assert!(matches!(
            store.retrieve(&id).await,
            Err(TrackerError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&id).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_root_fails_store_as_unavailable() {
        let dir = TempDir::new();
        let store = LocalBlobStore::open(&dir.0).await.unwrap();
        std::fs::remove_dir_all(&dir.0).unwrap();

        let err = store
            .store(Bytes::from_static(b"%PDF-1.4"), "application/pdf", BlobMetadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::UpstreamUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = TempDir::new();
        let store = LocalBlobStore::open(&dir.0).await.unwrap();
        assert!(matches!(
            store.retrieve("../../etc/passwd").await,
            Err(TrackerError::NotFound(_))
        ));
    }
}
