//! # マッピングストア
//!
//! 識別子 → [`UrlMapping`] を保持する永続化層の抽象インターフェース。
//! インメモリ実装は `memory` サブモジュールを参照。SQL等の実装もこのトレイトで差し替える。

mod memory;

pub use memory::MemoryMappingStore;

use async_trait::async_trait;
use dynstore_types::UrlMapping;

use crate::error::MappingError;

/// マッピングレコードの永続化インターフェース。
///
/// 各操作は単独でアトミックに見える必要があるが、操作をまたぐトランザクションは要求しない。
/// 複数のリクエストから並行に呼ばれるため `Send + Sync` を要求する。
#[async_trait]
pub trait MappingStore: Send + Sync + 'static {
    /// 識別子に対応するレコードを取得する。存在しなければ `None`。
    async fn get(&self, identifier: &str) -> Result<Option<UrlMapping>, MappingError>;

    /// レコードを識別子単位で上書き保存する。
    async fn set(&self, mapping: UrlMapping) -> Result<(), MappingError>;

    /// レコードを削除する。存在しない場合も成功とする。
    async fn delete(&self, identifier: &str) -> Result<(), MappingError>;

    /// 全レコードのスナップショットを返す。順序は不定。
    async fn get_all(&self) -> Result<Vec<UrlMapping>, MappingError>;

    /// `now` 時点で失効済みの非公開レコードを削除し、削除件数を返す。
    ///
    /// デフォルト実装は `get_all` の結果を走査し、削除直前に `get` で再確認してから
    /// 1件ずつ `delete` する。スナップショット取得後に再登録されたレコードは残す。
    /// 再確認と削除の間は原子的でないため、条件付き削除ができるストアは上書きすること。
    async fn cleanup(&self, now: u64) -> Result<usize, MappingError> {
        let mut removed = 0;
        for mapping in self.get_all().await? {
            if !mapping.is_expired_at(now) {
                continue;
            }
            match self.get(&mapping.identifier).await? {
                Some(current) if current.is_expired_at(now) => {
                    self.delete(&mapping.identifier).await?;
                    removed += 1;
                }
                _ => {}
            }
        }
        Ok(removed)
    }
}
