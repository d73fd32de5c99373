//! # Gateway設定
//!
//! 環境変数からの設定読み込み。ストレージクライアントは起動時にこの構造体から
//! 明示的に構築し、モジュールレベルのグローバル状態は持たない。
//!
//! テストでプロセス環境を汚さないよう、読み込みは `from_lookup` に任意の参照関数を渡せる。

use anyhow::Context;

use crate::context::AuthorizationType;

/// PUTボディの上限（100 MiB）
const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Gateway全体の設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// リッスンアドレス
    pub bind_addr: String,
    /// 認可が必要なアクションで使う認可方式
    pub auth_type: AuthorizationType,
    /// `headers` 方式で比較するBearerトークン。Noneの場合ヘッダー認可は常に失敗する。
    pub auth_token: Option<String>,
    /// リクエストボディの最大サイズ（バイト）
    pub max_body_bytes: usize,
    /// S3互換ストレージの設定。Noneの場合はNo-opバックエンドで起動する。
    pub s3: Option<S3Config>,
}

/// S3互換ストレージの接続設定。
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3互換APIのエンドポイント（例: https://s3.us-west-004.backblazeb2.com）
    pub endpoint: String,
    /// リージョン（R2等は "auto"）
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// パススタイルアドレッシング（MinIO等で必要）
    pub force_path_style: bool,
    /// 公開エンドポイント。設定時は署名なしの永続URLを返す。
    pub public_endpoint: Option<String>,
    /// `test` アクションで報告するプロバイダ名
    pub provider: String,
}

impl GatewayConfig {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 参照関数から読み込む。空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let auth_type = match get("STORAGE_AUTH_MODE") {
            Some(mode) => mode
                .parse()
                .with_context(|| format!("STORAGE_AUTH_MODEが不正です: {mode}"))?,
            None => AuthorizationType::Headers,
        };

        let max_body_bytes = match get("STORAGE_MAX_BODY_BYTES") {
            Some(v) => v
                .parse()
                .with_context(|| format!("STORAGE_MAX_BODY_BYTESが不正です: {v}"))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let s3 = get("S3_BUCKET_NAME").map(|bucket_name| S3Config {
            endpoint: get("S3_ENDPOINT").unwrap_or_else(|| "https://s3.amazonaws.com".to_string()),
            region: get("S3_REGION").unwrap_or_else(|| "auto".to_string()),
            access_key_id: get("S3_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: get("S3_SECRET_ACCESS_KEY").unwrap_or_default(),
            bucket_name,
            force_path_style: get("S3_FORCE_PATH_STYLE").as_deref() == Some("true"),
            public_endpoint: get("S3_PUBLIC_ENDPOINT"),
            provider: get("S3_PROVIDER").unwrap_or_else(|| "Unknown".to_string()),
        });

        Ok(Self {
            bind_addr: get("GATEWAY_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            auth_type,
            auth_token: get("STORAGE_AUTH_TOKEN"),
            max_body_bytes,
            s3,
        })
    }
}
