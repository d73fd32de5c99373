//! # コンテキストドライバ
//!
//! フレームワーク固有のリクエスト/レスポンスを、ハンドラが扱う中立な形式
//! （[`ParsedContext`] と [`ApiReply`]）に変換する境界。
//! axum実装は `axum_driver` サブモジュールを参照。

mod axum_driver;

pub use axum_driver::{AxumContextDriver, Authenticated};

use std::future::Future;
use std::str::FromStr;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// 認可方式
// ---------------------------------------------------------------------------

/// 認可の判定方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationType {
    /// `Authorization: Bearer <token>` ヘッダーを設定済みトークンと比較する
    Headers,
    /// 前段のミドルウェアがリクエスト拡張に付与した [`Authenticated`] を参照する
    Locals,
}

/// 未知の認可方式名
#[derive(Debug, thiserror::Error)]
#[error("未知の認可方式です: {0}（headers または locals）")]
pub struct UnknownAuthorizationType(String);

impl FromStr for AuthorizationType {
    type Err = UnknownAuthorizationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headers" => Ok(AuthorizationType::Headers),
            "locals" => Ok(AuthorizationType::Locals),
            _ => Err(UnknownAuthorizationType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// 中立なリクエスト / レスポンス
// ---------------------------------------------------------------------------

/// 認可判定関数。ドライバがリクエストごとに構築する。
type Authorizer = Box<dyn Fn(AuthorizationType) -> bool + Send + Sync>;

/// フレームワーク非依存のリクエストコンテキスト。
pub struct ParsedContext {
    headers: HeaderMap,
    body: Bytes,
    authorizer: Authorizer,
}

impl ParsedContext {
    pub fn new(
        headers: HeaderMap,
        body: Bytes,
        authorizer: impl Fn(AuthorizationType) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            headers,
            body,
            authorizer: Box::new(authorizer),
        }
    }

    /// ボディをJSONとしてデシリアライズする。失敗時は400。
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| GatewayError::BadRequest(format!("Invalid JSON body: {e}")))
    }

    /// ボディの生バイト列
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// ヘッダー値を取得する。存在しない、またはASCIIでない場合はNone。
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 必須ヘッダー用。存在するがASCIIとして読めない値は400にする。
    pub fn strict_header(&self, name: &str) -> Result<Option<&str>, GatewayError> {
        self.headers
            .get(name)
            .map(|v| {
                v.to_str()
                    .map_err(|_| GatewayError::BadRequest(format!("Invalid {name} header encoding")))
            })
            .transpose()
    }

    /// 指定方式で認可されているか
    pub fn is_authorized(&self, auth: AuthorizationType) -> bool {
        (self.authorizer)(auth)
    }
}

/// ハンドラの結果。ドライバがフレームワークのレスポンスに変換する。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: StatusCode,
    pub data: serde_json::Value,
}

impl ApiReply {
    pub fn json<T: Serialize>(status: StatusCode, data: &T) -> Result<Self, GatewayError> {
        let data = serde_json::to_value(data)
            .map_err(|e| GatewayError::Internal(format!("レスポンスのシリアライズに失敗: {e}")))?;
        Ok(Self { status, data })
    }

    pub fn ok<T: Serialize>(data: &T) -> Result<Self, GatewayError> {
        Self::json(StatusCode::OK, data)
    }

    /// エラーを `{"error": message}` のレスポンスに変換する。
    pub fn from_error(error: &GatewayError) -> Self {
        Self {
            status: error.status(),
            data: serde_json::json!({ "error": error.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// ドライバ
// ---------------------------------------------------------------------------

/// フレームワーク固有のリクエスト/レスポンスと中立な形式を相互変換するトレイト。
#[async_trait::async_trait]
pub trait ContextDriver: Send + Sync + 'static {
    /// フレームワークのリクエスト型
    type Request: Send + 'static;
    /// フレームワークのレスポンス型
    type Response;

    /// リクエストを読み取り、[`ParsedContext`] を構築する。
    async fn parse_context(&self, request: Self::Request) -> Result<ParsedContext, GatewayError>;

    /// ハンドラの結果をレスポンスに変換する。
    fn build_response(&self, reply: ApiReply) -> Self::Response;
}

/// リクエストをパースしてハンドラを実行し、結果をレスポンスに変換する。
///
/// ハンドラのエラーはここで `{"error": message}` に変換されるため、
/// トランスポート層に未処理のエラーが届くことはない。
pub async fn handle_endpoint<D, H, Fut>(driver: &D, request: D::Request, handler: H) -> D::Response
where
    D: ContextDriver,
    H: FnOnce(ParsedContext) -> Fut,
    Fut: Future<Output = Result<ApiReply, GatewayError>>,
{
    let outcome = match driver.parse_context(request).await {
        Ok(context) => handler(context).await,
        Err(e) => Err(e),
    };

    let reply = outcome.unwrap_or_else(|e| {
        log_rejection(&e);
        ApiReply::from_error(&e)
    });

    driver.build_response(reply)
}

/// エラーレスポンスを返す前のログ出力。5xxは `error`、それ以外は `debug`。
pub fn log_rejection(error: &GatewayError) {
    if error.status().is_server_error() {
        tracing::error!(error = %error, "ストレージAPIの処理に失敗");
    } else {
        tracing::debug!(error = %error, status = %error.status(), "リクエストを拒否");
    }
}
