//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。レスポンスボディは常に `{"error": message}`。
//! クライアントが文字列で判定するメッセージ（`Unauthorized`, `Invalid action` 等）は変更しないこと。

use axum::http::StatusCode;
use axum::Json;
use dynstore_core::MappingError;
use dynstore_types::ErrorResponse;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト（必須フィールド欠落、JSONパース失敗）
    #[error("{0}")]
    BadRequest(String),
    /// 認可が必要なアクションへの未認可アクセス
    #[error("Unauthorized")]
    Unauthorized,
    /// 未知のアクション
    #[error("Invalid action")]
    InvalidAction,
    /// オブジェクトストレージ操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// マッピングストア操作に失敗
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
    /// ストレージバックエンドが未設定
    #[error("noStorageConfigured")]
    NotConfigured,
}

impl GatewayError {
    /// エラーに対応するHTTPステータス
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) | GatewayError::InvalidAction => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Storage(_) | GatewayError::Mapping(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// 必須フィールド欠落エラーを作る。
    pub fn missing_field(field: &str, action: &str) -> Self {
        GatewayError::BadRequest(format!("{field} is required for {action} action"))
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
