//! # S3互換ストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2, Backblaze B2 等のS3互換APIを使用する実装。
//! 接続情報は [`S3Config`] で明示的に受け取る。

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};
use dynstore_core::{Clock, SystemClock};
use dynstore_types::{StoredObject, UrlMetadata};

use super::{StorageBackend, MAPPING_URL_EXPIRY_SECS};
use crate::config::S3Config;
use crate::error::GatewayError;

/// S3互換ストレージによるバックエンド実装。
pub struct S3StorageBackend {
    bucket: Box<s3::Bucket>,
    bucket_name: String,
    /// 公開エンドポイント。設定時は署名なしの永続URLを返す。
    public_endpoint: Option<String>,
    provider: String,
}

impl S3StorageBackend {
    /// 設定からS3互換バケットを初期化する。
    pub fn new(config: &S3Config) -> anyhow::Result<Self> {
        let region = s3::Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = s3::creds::Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None,
            None,
            None,
        )?;

        let mut bucket = s3::Bucket::new(&config.bucket_name, region, credentials)?;
        if config.force_path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            bucket_name: config.bucket_name.clone(),
            public_endpoint: config.public_endpoint.clone(),
            provider: config.provider.clone(),
        })
    }
}

/// 公開エンドポイントとキーを `/` 1つで連結する。
fn public_url(endpoint: &str, key: &str) -> String {
    if endpoint.ends_with('/') {
        format!("{endpoint}{key}")
    } else {
        format!("{endpoint}/{key}")
    }
}

/// rust-s3はステータスコードでエラーにならないため、2xx以外をエラーに変換する。
fn ensure_success(status: u16, operation: &str, key: &str) -> Result<(), GatewayError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(GatewayError::Storage(format!(
            "{operation}が失敗しました: key={key}, HTTP {status}"
        )))
    }
}

fn storage_error(operation: &str) -> impl Fn(s3::error::S3Error) -> GatewayError + '_ {
    move |e| GatewayError::Storage(format!("{operation}に失敗: {e}"))
}

#[async_trait::async_trait]
impl StorageBackend for S3StorageBackend {
    async fn url_metadata(&self, key: &str) -> Result<UrlMetadata, GatewayError> {
        if let Some(endpoint) = &self.public_endpoint {
            return Ok(UrlMetadata::permanent(public_url(endpoint, key)));
        }

        let url = self
            .bucket
            .presign_get(key, MAPPING_URL_EXPIRY_SECS, None)
            .await
            .map_err(storage_error("署名付きダウンロードURL生成"))?;
        let expires_at = SystemClock.now_millis() + u64::from(MAPPING_URL_EXPIRY_SECS) * 1000;

        Ok(UrlMetadata::expiring(url, expires_at))
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expiry_secs: u32,
    ) -> Result<String, GatewayError> {
        // Content-Typeを署名に含め、クライアントは同じ型でPUTする必要がある
        let value = HeaderValue::from_str(content_type).map_err(|_| {
            GatewayError::BadRequest(format!("Invalid contentType: {content_type}"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, value);

        self.bucket
            .presign_put(key, expiry_secs, Some(headers), None)
            .await
            .map_err(storage_error("署名付きアップロードURL生成"))
    }

    async fn presign_download(&self, key: &str, expiry_secs: u32) -> Result<String, GatewayError> {
        self.bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(storage_error("署名付きダウンロードURL生成"))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, GatewayError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(storage_error("オブジェクト一覧の取得"))?;

        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| StoredObject {
                key: object.key,
                size: object.size,
                last_modified: object.last_modified,
            })
            .collect())
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), GatewayError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(storage_error("オブジェクトのアップロード"))?;
        ensure_success(response.status_code(), "オブジェクトのアップロード", key)
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(storage_error("オブジェクトの削除"))?;
        ensure_success(response.status_code(), "オブジェクトの削除", key)
    }

    async fn rename(&self, key: &str, new_key: &str) -> Result<(), GatewayError> {
        let status = self
            .bucket
            .copy_object_internal(key, new_key)
            .await
            .map_err(storage_error("オブジェクトのコピー"))?;
        ensure_success(status, "オブジェクトのコピー", key)?;

        self.delete(key).await
    }

    async fn test_connection(&self) -> Result<(), GatewayError> {
        let (_, status) = self
            .bucket
            .list_page(String::new(), None, None, None, Some(1))
            .await
            .map_err(storage_error("バケットへの接続"))?;
        ensure_success(status, "バケットへの接続", &self.bucket_name)
    }

    fn provider(&self) -> &str {
        &self.provider
    }
}
