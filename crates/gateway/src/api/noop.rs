//! # No-opストレージAPI
//!
//! ストレージが設定されていない場合に使うビルダー。マッピングストアにも触れない。

use dynstore_types::UrlMetadata;

use super::StorageApiBuilder;
use crate::context::{ApiReply, ParsedContext};
use crate::error::GatewayError;

/// ストレージ未設定時のビルダー。全ハンドラが503 `noStorageConfigured` を返す。
pub struct NoOpStorageApi;

#[async_trait::async_trait]
impl StorageApiBuilder for NoOpStorageApi {
    async fn resolve_url(&self, _identifier: &str) -> Result<UrlMetadata, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn handle_post(&self, _ctx: &ParsedContext) -> Result<ApiReply, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn handle_put(&self, _ctx: &ParsedContext) -> Result<ApiReply, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
