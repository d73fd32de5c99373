//! # インメモリ マッピングストア
//!
//! DashMapによる並行アクセス可能なストア。プロセス終了でデータは失われる。

use async_trait::async_trait;
use dashmap::DashMap;
use dynstore_types::UrlMapping;

use super::MappingStore;
use crate::error::MappingError;

/// DashMapを使ったインメモリのマッピングストア。
///
/// 開発環境や単一プロセス構成でのデフォルト実装。
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    data: DashMap<String, UrlMapping>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保持しているレコード数（失効済みを含む）
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn get(&self, identifier: &str) -> Result<Option<UrlMapping>, MappingError> {
        Ok(self.data.get(identifier).map(|entry| entry.value().clone()))
    }

    async fn set(&self, mapping: UrlMapping) -> Result<(), MappingError> {
        self.data.insert(mapping.identifier.clone(), mapping);
        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<(), MappingError> {
        self.data.remove(identifier);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<UrlMapping>, MappingError> {
        Ok(self.data.iter().map(|entry| entry.value().clone()).collect())
    }

    /// シャード単位のロック内で判定と削除を行うため、走査中の再登録を消さない。
    async fn cleanup(&self, now: u64) -> Result<usize, MappingError> {
        let mut removed = 0;
        self.data.retain(|_, mapping| {
            let expired = mapping.is_expired_at(now);
            if expired {
                removed += 1;
            }
            !expired
        });
        Ok(removed)
    }
}
