use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use uuid::Uuid;

use super::{BlobMetadata, BlobObject, BlobStore};
use crate::errors::{Result, TrackerError};

struct Entry {
    data: Bytes,
    content_type: String,
    metadata: BlobMetadata,
}

/// 进程内后端，重启即丢失
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: DashMap<String, Entry>,
    failing_stores: AtomicU32,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.entries.contains_key(file_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 让接下来的 `n` 次写入失败，用于演练上游故障
    pub fn fail_next_stores(&self, n: u32) {
        self.failing_stores.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(
        &self,
        data: Bytes,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> Result<String> {
        let should_fail = self
            .failing_stores
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TrackerError::upstream_unavailable(
                "memory blob store write failure",
            ));
        }

        let file_id = Uuid::new_v4().to_string();
        self.entries.insert(
            file_id.clone(),
            Entry {
                data,
                content_type: content_type.to_string(),
                metadata,
            },
        );
        Ok(file_id)
    }

    async fn retrieve(&self, file_id: &str) -> Result<BlobObject> {
        let entry = self
            .entries
            .get(file_id)
            .ok_or_else(|| TrackerError::not_found(format!("file {file_id} not found")))?;

        let data = entry.data.clone();
        Ok(BlobObject {
            size: data.len() as u64,
            content_type: entry.content_type.clone(),
            metadata: entry.metadata.clone(),
            stream: Box::pin(futures_util::stream::once(async move {
                Ok::<_, std::io::Error>(data)
            })),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        self.entries
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| TrackerError::not_found(format!("file {file_id} not found")))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
