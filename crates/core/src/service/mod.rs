//! # URLマッピングサービス
//!
//! キャッシュされたURLの有効性を判定し、失効時は呼び出し側のコールバックで再生成する。
//! サービス自身はオブジェクトストレージと直接通信しない。
//!
//! ## 並行性
//! ストアの読み込みはコールバック前、書き込みはコールバック後に行い、
//! その間ロックは保持しない。同じ識別子への並行な解決は両方がリフレッシュし得る
//! （各書き込みは自己完結したレコードで、最後の書き込みが残る）。

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;

use dynstore_types::{UrlMapping, UrlMetadata};

use crate::clock::{Clock, SystemClock};
use crate::error::MappingError;
use crate::identifier::{create_identifier, extract_key};
use crate::store::{MappingStore, MemoryMappingStore};

/// 識別子 → URLの解決・自動リフレッシュを行うサービス。
///
/// `Clone` は内部のストア・時計を共有する。
#[derive(Clone)]
pub struct UrlMappingService {
    store: Arc<dyn MappingStore>,
    clock: Arc<dyn Clock>,
}

impl UrlMappingService {
    /// システム時計でサービスを構築する。
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// 時計を指定してサービスを構築する。
    pub fn with_clock(store: Arc<dyn MappingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// インメモリストアを使うサービスを構築する。
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryMappingStore::new()))
    }

    /// 識別子をアクセスURLに解決する。
    ///
    /// 1. 公開URLのレコードはそのまま返す（書き込み・リフレッシュなし）
    /// 2. レコードが無い、または `expires_at <= now` なら `refresh(key)` で再生成して登録する
    /// 3. それ以外はキャッシュを返す
    ///
    /// `expires_at` を持たない非公開レコードは失効しないものとして扱う。
    /// `refresh` のエラーはそのまま返し、その場合ストアには書き込まない。
    pub async fn resolve<F, Fut, E>(&self, identifier: &str, refresh: F) -> Result<UrlMetadata, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<UrlMetadata, E>>,
        E: From<MappingError>,
    {
        let mapping = self.store.get(identifier).await?;
        let now = self.clock.now_millis();

        match mapping {
            Some(mapping) if mapping.is_permanent => {
                return Ok(UrlMetadata::permanent(mapping.url));
            }
            Some(mapping) if !mapping.is_expired_at(now) => {
                return Ok(mapping.metadata());
            }
            _ => {}
        }

        let key = extract_key(identifier).to_string();
        let metadata = refresh(key).await?;
        self.register(identifier, metadata.clone()).await?;

        Ok(metadata)
    }

    /// マッピングを登録する。既存レコードは全置換され、`created_at` も現在時刻になる。
    pub async fn register(&self, identifier: &str, metadata: UrlMetadata) -> Result<(), MappingError> {
        let mapping = UrlMapping::new(identifier, metadata, self.clock.now_millis());
        self.store.set(mapping).await
    }

    /// マッピングを削除する。存在しない場合も成功する。
    pub async fn delete(&self, identifier: &str) -> Result<(), MappingError> {
        self.store.delete(identifier).await
    }

    /// 失効済みの非公開マッピングを削除し、削除件数を返す。
    pub async fn cleanup(&self) -> Result<usize, MappingError> {
        self.store.cleanup(self.clock.now_millis()).await
    }

    /// 全マッピングのスナップショット（デバッグ・管理用）
    pub async fn get_all(&self) -> Result<Vec<UrlMapping>, MappingError> {
        self.store.get_all().await
    }

    /// ストレージキーから識別子を生成する。
    pub fn create_identifier(&self, key: &str) -> String {
        create_identifier(key)
    }
}
