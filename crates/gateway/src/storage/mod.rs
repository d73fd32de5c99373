//! # オブジェクトストレージ
//!
//! Gateway運用者が選択可能なオブジェクトストレージの抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use s3::S3StorageBackend;

#[cfg(test)]
pub(crate) mod mock;

use dynstore_types::{StoredObject, UrlMetadata};

use crate::error::GatewayError;

/// アップロード・ダウンロード用署名付きURLの有効期限（秒）
pub const PRESIGN_EXPIRY_SECS: u32 = 3600;

/// URLマッピングに登録する署名付きURLの有効期限（秒、7日）。S3の上限と同じ。
pub const MAPPING_URL_EXPIRY_SECS: u32 = 7 * 24 * 60 * 60;

/// オブジェクトストレージの抽象インターフェース。
///
/// Gateway運用者はS3互換ストレージ（MinIO, AWS S3, Cloudflare R2, Backblaze B2等）や
/// その他のストレージバックエンドを実装として選択できる。
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// キーに対するアクセスURLを生成する。
    ///
    /// 公開エンドポイントがあれば永続URL、なければ期限付きの署名付きURLを返す。
    async fn url_metadata(&self, key: &str) -> Result<UrlMetadata, GatewayError>;

    /// クライアントが直接アップロードするための署名付きURL（PUT）を生成する。
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expiry_secs: u32,
    ) -> Result<String, GatewayError>;

    /// ダウンロード用の署名付きURL（GET）を生成する。
    async fn presign_download(&self, key: &str, expiry_secs: u32) -> Result<String, GatewayError>;

    /// プレフィックスに一致するオブジェクトを列挙する。
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, GatewayError>;

    /// オブジェクトを書き込む。
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), GatewayError>;

    async fn delete(&self, key: &str) -> Result<(), GatewayError>;

    /// オブジェクトを `new_key` にコピーしてから元を削除する。
    async fn rename(&self, key: &str, new_key: &str) -> Result<(), GatewayError>;

    /// 最小限のリクエストで接続と認証情報を確認する。
    async fn test_connection(&self) -> Result<(), GatewayError>;

    /// プロバイダ名（`test` アクションの表示用）
    fn provider(&self) -> &str;
}
