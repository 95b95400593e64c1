//! 缓存层
//!
//! 目前只有进程内的 Moka 实现，用于认证时的用户信息缓存。

pub mod object_cache;

use async_trait::async_trait;

pub use object_cache::moka::MokaCacheWrapper;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    Found(T),
    NotFound,
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<String>;
    async fn insert_raw(&self, key: String, value: String, ttl: u64);
    async fn remove(&self, key: &str);
}
