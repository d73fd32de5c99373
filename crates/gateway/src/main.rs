//! # Dynamic Storage Gateway
//!
//! 論理識別子（`storage-file://<key>`）を利用可能なURLに解決し、
//! S3互換オブジェクトストレージへのアップロード・一覧・削除・リネームを仲介するHTTPサーバー。
//!
//! ## エンドポイント
//! - `POST /api/storage` — アクション振り分け（resolveUrl, publicUrl, upload, list, delete,
//!   rename, download, cleanup, mappings, test）
//! - `PUT /api/storage` — バイナリアップロード
//! - `GET /api/storage/resolve` — サーバー側の識別子解決

mod api;
mod config;
mod context;
mod endpoints;
mod error;
mod storage;

use std::sync::Arc;

use dynstore_core::UrlMappingService;

use crate::api::{NoOpStorageApi, StorageApi, StorageApiBuilder};
use crate::config::GatewayConfig;
use crate::context::AxumContextDriver;

/// 設定に応じたビルダーを構築する。ストレージ未設定ならNo-op。
fn build_storage_api(
    config: &GatewayConfig,
    mapping: UrlMappingService,
) -> anyhow::Result<Arc<dyn StorageApiBuilder>> {
    match &config.s3 {
        #[cfg(feature = "vendor-aws")]
        Some(s3_config) => {
            let storage = storage::S3StorageBackend::new(s3_config)?;
            tracing::info!(
                bucket = %s3_config.bucket_name,
                endpoint = %s3_config.endpoint,
                public_endpoint = ?s3_config.public_endpoint,
                provider = %s3_config.provider,
                "S3互換ストレージを設定"
            );
            Ok(Arc::new(api::StorageApiService::new(
                mapping,
                Arc::new(storage),
                config.auth_type,
            )))
        }
        _ => {
            tracing::warn!("ストレージが未設定です。全リクエストに503を返します");
            Ok(Arc::new(NoOpStorageApi))
        }
    }
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(auth_type = ?config.auth_type, "認可方式");
    if config.auth_type == context::AuthorizationType::Headers && config.auth_token.is_none() {
        tracing::warn!("STORAGE_AUTH_TOKENが未設定です。認可が必要なアクションは全て401になります");
    }

    let builder = build_storage_api(&config, UrlMappingService::memory())?;
    let driver = AxumContextDriver::new(config.auth_token.clone(), config.max_body_bytes);
    let app = endpoints::router(Arc::new(StorageApi::new(driver, builder)), config.auth_type);

    tracing::info!("Gatewayを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
