//! # ストレージAPIサービス
//!
//! POSTアクションとPUTアップロードの実処理。マッピングの整合性（公開URLの登録、
//! 削除・リネーム時の付け替え）はここで維持する。

use std::sync::Arc;

use axum::http::StatusCode;
use dynstore_core::UrlMappingService;
use dynstore_types::{
    ActionRequest, CleanupResponse, ConnectionTestResponse, DeleteResponse, DownloadUrlResponse,
    ListResponse, MappingsResponse, PublicUrlResponse, PutUploadResponse, RenameResponse,
    UploadUrlResponse, UrlMetadata, DEFAULT_CONTENT_TYPE, STORAGE_KEY_HEADER,
};

use super::action::{ActionKind, StorageAction};
use super::StorageApiBuilder;
use crate::context::{ApiReply, AuthorizationType, ParsedContext};
use crate::error::GatewayError;
use crate::storage::{StorageBackend, PRESIGN_EXPIRY_SECS};

/// URLマッピングサービスとストレージバックエンドを使うビルダー。
pub struct StorageApiService {
    mapping: UrlMappingService,
    storage: Arc<dyn StorageBackend>,
    auth: AuthorizationType,
}

impl StorageApiService {
    pub fn new(
        mapping: UrlMappingService,
        storage: Arc<dyn StorageBackend>,
        auth: AuthorizationType,
    ) -> Self {
        Self {
            mapping,
            storage,
            auth,
        }
    }

    async fn dispatch(&self, action: StorageAction) -> Result<ApiReply, GatewayError> {
        match action {
            StorageAction::ResolveUrl { identifier } => {
                let metadata = self.resolve_url(&identifier).await?;
                ApiReply::ok(&metadata)
            }
            StorageAction::PublicUrl { key } => {
                let metadata = self.storage.url_metadata(&key).await?;
                let identifier = self.mapping.create_identifier(&key);
                self.mapping.register(&identifier, metadata.clone()).await?;
                ApiReply::ok(&PublicUrlResponse {
                    metadata,
                    identifier,
                })
            }
            StorageAction::Upload { key, content_type } => {
                let url = self
                    .storage
                    .presign_upload(&key, &content_type, PRESIGN_EXPIRY_SECS)
                    .await?;
                ApiReply::ok(&UploadUrlResponse { url, key })
            }
            StorageAction::List { prefix } => {
                let files = self.storage.list(&prefix).await?;
                ApiReply::ok(&ListResponse { files })
            }
            StorageAction::Delete { key } => {
                self.storage.delete(&key).await?;
                self.mapping
                    .delete(&self.mapping.create_identifier(&key))
                    .await?;
                tracing::info!(key = %key, "オブジェクトを削除");
                ApiReply::ok(&DeleteResponse { success: true })
            }
            StorageAction::Rename { key, new_key } => {
                self.storage.rename(&key, &new_key).await?;
                self.mapping
                    .delete(&self.mapping.create_identifier(&key))
                    .await?;
                let metadata = self.storage.url_metadata(&new_key).await?;
                self.mapping
                    .register(&self.mapping.create_identifier(&new_key), metadata)
                    .await?;
                tracing::info!(key = %key, new_key = %new_key, "オブジェクトをリネーム");
                ApiReply::ok(&RenameResponse {
                    success: true,
                    new_key,
                })
            }
            StorageAction::Download { key } => {
                let url = self
                    .storage
                    .presign_download(&key, PRESIGN_EXPIRY_SECS)
                    .await?;
                ApiReply::ok(&DownloadUrlResponse { url })
            }
            StorageAction::Cleanup => {
                let deleted_count = self.mapping.cleanup().await?;
                tracing::info!(deleted_count, "失効済みマッピングを削除");
                ApiReply::ok(&CleanupResponse { deleted_count })
            }
            StorageAction::Mappings => {
                let mappings = self.mapping.get_all().await?;
                ApiReply::ok(&MappingsResponse { mappings })
            }
            StorageAction::Test => self.test_connection().await,
        }
    }

    /// 接続テスト。失敗はエラーとして伝播させず、500の `{success: false, error}` で返す。
    async fn test_connection(&self) -> Result<ApiReply, GatewayError> {
        match self.storage.test_connection().await {
            Ok(()) => ApiReply::ok(&ConnectionTestResponse {
                success: true,
                message: Some("Successfully connected to S3-compatible storage".to_string()),
                provider: Some(self.storage.provider().to_string()),
                error: None,
            }),
            Err(e) => {
                tracing::warn!(error = %e, provider = self.storage.provider(), "ストレージ接続テストに失敗");
                ApiReply::json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &ConnectionTestResponse {
                        success: false,
                        message: None,
                        provider: None,
                        error: Some(e.to_string()),
                    },
                )
            }
        }
    }
}

#[async_trait::async_trait]
impl StorageApiBuilder for StorageApiService {
    async fn resolve_url(&self, identifier: &str) -> Result<UrlMetadata, GatewayError> {
        self.mapping
            .resolve(identifier, |key| async move {
                self.storage.url_metadata(&key).await
            })
            .await
    }

    async fn handle_post(&self, ctx: &ParsedContext) -> Result<ApiReply, GatewayError> {
        let request: ActionRequest = ctx.json()?;
        let kind = request
            .action
            .as_deref()
            .and_then(ActionKind::parse)
            .ok_or(GatewayError::InvalidAction)?;

        // 認可判定はフィールド検証・ストレージ呼び出しより前
        if kind.requires_auth() && !ctx.is_authorized(self.auth) {
            return Err(GatewayError::Unauthorized);
        }

        let action = StorageAction::from_request(kind, request)?;
        self.dispatch(action).await
    }

    async fn handle_put(&self, ctx: &ParsedContext) -> Result<ApiReply, GatewayError> {
        if !ctx.is_authorized(self.auth) {
            return Err(GatewayError::Unauthorized);
        }

        let key = ctx
            .strict_header(STORAGE_KEY_HEADER)?
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GatewayError::BadRequest("Missing x-storage-key header".to_string()))?;
        let content_type = ctx
            .header("content-type")
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        self.storage.put(key, ctx.bytes(), content_type).await?;
        tracing::info!(
            key = %key,
            content_type = %content_type,
            size = ctx.bytes().len(),
            "オブジェクトをアップロード"
        );

        ApiReply::ok(&PutUploadResponse {
            message: "File uploaded successfully".to_string(),
            key: key.to_string(),
        })
    }
}
