//! 文件存储
//!
//! 按不透明的文件 ID 存取上传内容，并为每个文件保存一份键值元数据。
//! 写入与提交记录不在同一事务中，孤儿文件是可以接受的。

mod local;
mod memory;

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use tracing::warn;

use crate::config::UploadConfig;
use crate::errors::{Result, TrackerError};

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// 读取时按块返回的字节流
pub type BlobStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// 随文件保存的元数据，存储层不做解释
pub type BlobMetadata = BTreeMap<String, String>;

/// 读取结果
pub struct BlobObject {
    pub size: u64,
    pub content_type: String,
    pub metadata: BlobMetadata,
    pub stream: BlobStream,
}

impl std::fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobObject")
            .field("size", &self.size)
            .field("content_type", &self.content_type)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 保存内容并返回新的文件 ID
    async fn store(
        &self,
        data: Bytes,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<String>;

    /// 读取文件；ID 不存在时返回 NotFound
    async fn retrieve(&self, file_id: &str) -> Result<BlobObject>;

    /// 删除文件；ID 不存在时返回 NotFound
    async fn delete(&self, file_id: &str) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// 根据配置创建存储后端
pub async fn create_blob_store(config: &UploadConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend.as_str() {
        "local" => Ok(Arc::new(LocalBlobStore::open(&config.dir).await?)),
        "memory" => {
            warn!("Using in-memory blob store; uploaded files are lost on restart");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
        other => Err(TrackerError::blob_store_plugin_not_found(format!(
            "unknown blob store backend '{other}'"
        ))),
    }
}
