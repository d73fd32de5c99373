//! # Core エラー型

/// URLマッピング層のエラー型。
///
/// リフレッシュコールバック自身のエラーはこの型を経由せず、
/// 呼び出し側のエラー型のまま `resolve` から伝播する。
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// マッピングストアの読み書きに失敗
    #[error("マッピングストアの操作に失敗: {0}")]
    Store(String),
}
