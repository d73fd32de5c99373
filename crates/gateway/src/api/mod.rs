//! # ストレージAPI
//!
//! コンテキストドライバ・URLマッピングサービス・ストレージバックエンドを組み合わせ、
//! HTTPメソッドごとのハンドラを提供する。
//!
//! - POST: `action` フィールドで処理を振り分ける
//! - PUT: `x-storage-key` ヘッダーのキーにボディをそのまま書き込む
//! - サーバー側の識別子解決（`resolve_url`）

pub mod action;
mod noop;
mod service;


pub use noop::NoOpStorageApi;
pub use service::StorageApiService;

use std::sync::Arc;

use dynstore_types::UrlMetadata;

use crate::context::{handle_endpoint, ApiReply, ContextDriver, ParsedContext};
use crate::error::GatewayError;

/// フレームワーク非依存のストレージAPI実装。
#[async_trait::async_trait]
pub trait StorageApiBuilder: Send + Sync {
    /// 識別子をアクセスURLに解決する（必要ならリフレッシュする）。
    async fn resolve_url(&self, identifier: &str) -> Result<UrlMetadata, GatewayError>;

    /// POST: アクションを振り分けて実行する。
    async fn handle_post(&self, ctx: &ParsedContext) -> Result<ApiReply, GatewayError>;

    /// PUT: バイナリをアップロードする。
    async fn handle_put(&self, ctx: &ParsedContext) -> Result<ApiReply, GatewayError>;
}

/// ドライバとビルダーを結合したエンドポイント群。
pub struct StorageApi<D: ContextDriver> {
    driver: D,
    builder: Arc<dyn StorageApiBuilder>,
}

impl<D: ContextDriver> StorageApi<D> {
    pub fn new(driver: D, builder: Arc<dyn StorageApiBuilder>) -> Self {
        Self { driver, builder }
    }

    pub async fn post(&self, request: D::Request) -> D::Response {
        let builder = &self.builder;
        handle_endpoint(&self.driver, request, |ctx| async move {
            builder.handle_post(&ctx).await
        })
        .await
    }

    pub async fn put(&self, request: D::Request) -> D::Response {
        let builder = &self.builder;
        handle_endpoint(&self.driver, request, |ctx| async move {
            builder.handle_put(&ctx).await
        })
        .await
    }

    pub async fn resolve_url(&self, identifier: &str) -> Result<UrlMetadata, GatewayError> {
        self.builder.resolve_url(identifier).await
    }
}
