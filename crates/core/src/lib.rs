//! # Dynamic Storage Core
//!
//! 論理識別子（`storage-file://<key>`）から利用可能なアクセスURLを解決する
//! URLマッピングキャッシュを実装する。
//!
//! ## 構成
//! - [`MappingStore`] — 識別子 → マッピングレコードの永続化（差し替え可能）
//! - [`MemoryMappingStore`] — 並行アクセス可能なインメモリ実装
//! - [`UrlMappingService`] — キャッシュの有効性判定とリフレッシュの状態機械
//! - [`Clock`] — 失効判定に使う現在時刻の供給元
//!
//! ## 解決フロー
//! 1. ストアからレコードを取得する
//! 2. 公開URLならそのまま返す
//! 3. レコードが無い、または失効済みならリフレッシュコールバックで再生成し、登録する
//! 4. それ以外はキャッシュされたURLを返す

mod clock;
mod error;
mod identifier;
mod service;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::MappingError;
pub use identifier::{create_identifier, extract_key, IDENTIFIER_PREFIX};
pub use service::UrlMappingService;
pub use store::{MappingStore, MemoryMappingStore};

pub use dynstore_types::{UrlMapping, UrlMetadata};
